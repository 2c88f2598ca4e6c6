/// 表格数据交换
///
/// 包括三类表：
/// - 参考点元数据（ID, X, Y, File）
/// - 指纹数据库交换格式（RP_ID, X, Y, 各设备地址列按字典序）
/// - 评估结果日志（k, method, mean_error, std_error，只追加）

use std::fs::OpenOptions;
use std::path::Path;

use tracing::warn;

use crate::algorithms::evaluation::EvaluationResult;
use crate::algorithms::fingerprint::{FingerprintDatabase, FingerprintRecord, ReferencePoint};
use crate::error::PositioningError;

/// 指纹数据库交换格式的固定前三列
pub const DB_FIXED_HEADERS: [&str; 3] = ["RP_ID", "X", "Y"];

/// 评估结果日志的列
pub const RESULT_HEADERS: [&str; 4] = ["k", "method", "mean_error", "std_error"];

/// 读取参考点元数据
///
/// 元数据文件缺失是不可恢复错误（快速失败）；单行解析缺陷记录警告后跳过。
pub fn load_reference_points(path: &Path) -> Result<Vec<ReferencePoint>, PositioningError> {
    if !path.is_file() {
        return Err(PositioningError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut points = Vec::new();
    for (line, result) in reader.deserialize::<ReferencePoint>().enumerate() {
        match result {
            Ok(point) => points.push(point),
            Err(error) => {
                warn!(path = %path.display(), line, %error, "跳过无法解析的元数据行");
            }
        }
    }
    Ok(points)
}

/// 写出指纹数据库
///
/// 表头为 RP_ID, X, Y 加按字典序排列的设备地址列；
/// 记录对每一列都有值（缺失项在组装时已回填哨兵值）。
pub fn write_fingerprint_db(
    db: &FingerprintDatabase,
    path: &Path,
) -> Result<(), PositioningError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = DB_FIXED_HEADERS.iter().map(|h| h.to_string()).collect();
    header.extend(db.columns().iter().cloned());
    writer.write_record(&header)?;

    for record in db.records() {
        let mut row = vec![
            record.rp_id.clone(),
            record.x.to_string(),
            record.y.to_string(),
        ];
        for column in db.columns() {
            row.push(record.rssi(column).unwrap_or(db.sentinel()).to_string());
        }
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|source| PositioningError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 读回指纹数据库
///
/// 坐标或信号值无法解析的行记录警告后跳过；无法解析的信号值以哨兵值代替，
/// 保证数据库不变量（没有 NaN/缺项）仍然成立。
pub fn read_fingerprint_db(
    path: &Path,
    sentinel: f64,
) -> Result<FingerprintDatabase, PositioningError> {
    if !path.is_file() {
        return Err(PositioningError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    for (index, expected) in DB_FIXED_HEADERS.iter().enumerate() {
        if headers.get(index) != Some(*expected) {
            return Err(PositioningError::MissingColumn {
                path: path.to_path_buf(),
                column: expected.to_string(),
            });
        }
    }
    let columns: Vec<String> = headers.iter().skip(3).map(str::to_string).collect();

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(error) => {
                warn!(path = %path.display(), line, %error, "跳过无法解析的行");
                continue;
            }
        };

        let rp_id = match row.get(0) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!(path = %path.display(), line, "跳过缺少 RP_ID 的行");
                continue;
            }
        };
        let (x, y) = match (
            row.get(1).and_then(|v| v.trim().parse::<f64>().ok()),
            row.get(2).and_then(|v| v.trim().parse::<f64>().ok()),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                warn!(path = %path.display(), line, "跳过坐标无法解析的行");
                continue;
            }
        };

        let mut signal_vector = std::collections::HashMap::new();
        for (offset, column) in columns.iter().enumerate() {
            let value = row
                .get(offset + 3)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(sentinel);
            signal_vector.insert(column.clone(), value);
        }

        records.push(FingerprintRecord::new(rp_id, x, y, signal_vector));
    }

    Ok(FingerprintDatabase::assemble(records, sentinel))
}

/// 追加评估结果
///
/// 文件不存在时先写表头；"无有效预测"的结果记录警告且不写入，
/// 避免与数值误差混淆。
pub fn append_results(path: &Path, results: &[EvaluationResult]) -> Result<(), PositioningError> {
    let exists = path.is_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PositioningError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !exists {
        writer.write_record(RESULT_HEADERS)?;
    }

    for result in results {
        match &result.stats {
            Some(stats) => {
                writer.write_record([
                    result.k.to_string(),
                    result.method.clone(),
                    stats.mean_error.to_string(),
                    stats.std_error.to_string(),
                ])?;
            }
            None => {
                warn!(method = %result.method, k = result.k, "无有效预测，不写入结果日志");
            }
        }
    }

    writer.flush().map_err(|source| PositioningError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::evaluation::ErrorStats;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::fs;

    fn record(rp_id: &str, x: f64, y: f64, pairs: &[(&str, f64)]) -> FingerprintRecord {
        let mut vector = HashMap::new();
        for (address, rssi) in pairs {
            vector.insert(address.to_string(), *rssi);
        }
        FingerprintRecord::new(rp_id.to_string(), x, y, vector)
    }

    #[test]
    fn test_load_reference_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        fs::write(&path, "ID,X,Y,File\nRP1,10.5,20,rp1\nRP2,坏坐标,0,rp2\nRP3,30,40,rp3\n")
            .unwrap();

        let points = load_reference_points(&path).unwrap();
        // 坏行被跳过
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].id, "RP1");
        assert_eq!(points[0].x, 10.5);
        assert_eq!(points[1].source_file, "rp3");
    }

    #[test]
    fn test_load_reference_points_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_reference_points(&dir.path().join("nope.csv")),
            Err(PositioningError::MissingFile(_))
        ));
    }

    #[test]
    fn test_fingerprint_db_round_trip() {
        let db = FingerprintDatabase::assemble(
            vec![
                record("RP1", 0.0, 0.0, &[("m1", -50.0)]),
                record("RP2", 10.0, 5.0, &[("m2", -70.5)]),
            ],
            -100.0,
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fingerprints.csv");
        write_fingerprint_db(&db, &path).unwrap();

        let loaded = read_fingerprint_db(&path, -100.0).unwrap();
        assert_eq!(loaded.columns(), db.columns());
        assert_eq!(loaded.len(), 2);
        let rp1 = loaded.get("RP1").unwrap();
        assert_eq!(rp1.rssi("m1"), Some(-50.0));
        assert_eq!(rp1.rssi("m2"), Some(-100.0));
        let rp2 = loaded.get("RP2").unwrap();
        assert_eq!(rp2.rssi("m2"), Some(-70.5));
        assert!((rp2.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_read_fingerprint_db_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "ID,X,Y,m1\nRP1,0,0,-50\n").unwrap();
        assert!(matches!(
            read_fingerprint_db(&path, -100.0),
            Err(PositioningError::MissingColumn { .. })
        ));
    }

    fn result_with_stats(method: &str, mean: f64) -> EvaluationResult {
        EvaluationResult {
            method: method.to_string(),
            k: 3,
            stats: Some(ErrorStats {
                mean_error: mean,
                std_error: 1.0,
                sample_count: 4,
            }),
            excluded: 0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_results_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        append_results(&path, &[result_with_stats("Raw", 12.5)]).unwrap();
        append_results(&path, &[result_with_stats("Kalman", 9.75)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "k,method,mean_error,std_error");
        assert!(lines[1].starts_with("3,Raw,12.5"));
        assert!(lines[2].starts_with("3,Kalman,9.75"));
    }

    #[test]
    fn test_append_results_skips_no_valid_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let empty = EvaluationResult {
            method: "Median".to_string(),
            k: 3,
            stats: None,
            excluded: 5,
            timestamp: Utc::now(),
        };
        append_results(&path, &[empty]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // 只有表头，没有数据行
        assert_eq!(content.lines().count(), 1);
    }
}
