/// RSSI 日志读取
///
/// 分隔符与取值列不做文件名推断，由调用方通过 LogFormat 显式指定。
/// 单行的解析缺陷（数值无法解析、字段缺失）记录警告后跳过，
/// 绝不中断整个文件的读取；表头缺少必需列才算文件级错误。

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::warn;

use crate::algorithms::builder::LogSource;
use crate::algorithms::fingerprint::{ReferencePoint, SignalSample};
use crate::config::RunConfig;
use crate::error::PositioningError;

/// 时间戳列名（可选列）
pub const TIMESTAMP_HEADER: &str = "Timestamp";

/// 设备地址列名
pub const ADDRESS_HEADER: &str = "Device Address";

/// 日志的取值列
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueColumn {
    /// 原始 RSSI 列
    Rssi,
    /// 滤波后的 RSSI 列
    FilteredRssi,
}

impl ValueColumn {
    /// 对应的表头列名
    pub fn header_name(&self) -> &'static str {
        match self {
            ValueColumn::Rssi => "RSSI",
            ValueColumn::FilteredRssi => "Filtered_RSSI",
        }
    }
}

/// 日志格式描述
///
/// 每个日志来源由调用方显式给出分隔符与取值列，
/// 替代按文件名子串猜测格式的做法。
#[derive(Clone, Debug)]
pub struct LogFormat {
    /// 字段分隔符
    pub delimiter: u8,
    /// 取值列
    pub value_column: ValueColumn,
    /// 可选的设备地址过滤（不匹配的行被丢弃）
    pub address_filter: Option<Regex>,
}

impl LogFormat {
    /// 制表符分隔的原始扫描日志
    pub fn tab_raw() -> Self {
        LogFormat {
            delimiter: b'\t',
            value_column: ValueColumn::Rssi,
            address_filter: None,
        }
    }

    /// 逗号分隔的滤波输出日志
    pub fn comma_filtered() -> Self {
        LogFormat {
            delimiter: b',',
            value_column: ValueColumn::FilteredRssi,
            address_filter: None,
        }
    }

    /// 附加设备地址过滤
    pub fn with_address_filter(mut self, pattern: &str) -> Result<Self, PositioningError> {
        self.address_filter = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// 附加运行配置中的地址过滤（配置未设置 pattern 时原样返回）
    pub fn with_config_filter(mut self, config: &RunConfig) -> Result<Self, PositioningError> {
        if let Some(filter) = config.address_filter()? {
            self.address_filter = Some(filter);
        }
        Ok(self)
    }
}

/// 读取一个 RSSI 日志文件
pub fn read_rssi_log(path: &Path, format: &LogFormat) -> Result<Vec<SignalSample>, PositioningError> {
    if !path.is_file() {
        return Err(PositioningError::MissingFile(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(format.delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let position_of = |name: &str| headers.iter().position(|header| header == name);

    let address_index =
        position_of(ADDRESS_HEADER).ok_or_else(|| PositioningError::MissingColumn {
            path: path.to_path_buf(),
            column: ADDRESS_HEADER.to_string(),
        })?;
    let value_name = format.value_column.header_name();
    let value_index = position_of(value_name).ok_or_else(|| PositioningError::MissingColumn {
        path: path.to_path_buf(),
        column: value_name.to_string(),
    })?;
    let timestamp_index = position_of(TIMESTAMP_HEADER);

    let mut samples = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %path.display(), line, %error, "跳过无法解析的行");
                continue;
            }
        };

        let address = match record.get(address_index) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                warn!(path = %path.display(), line, "跳过缺少设备地址的行");
                continue;
            }
        };

        if let Some(filter) = &format.address_filter {
            if !filter.is_match(&address) {
                continue;
            }
        }

        let rssi = match record
            .get(value_index)
            .and_then(|value| value.trim().parse::<f64>().ok())
        {
            Some(rssi) => rssi,
            None => {
                warn!(path = %path.display(), line, "跳过 RSSI 无法解析的行");
                continue;
            }
        };

        let timestamp = timestamp_index
            .and_then(|index| record.get(index))
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        samples.push(SignalSample {
            device_address: address,
            rssi,
            timestamp,
        });
    }

    Ok(samples)
}

/// 目录日志源
///
/// 按参考点元数据中的文件名取日志，路径为
/// `dir/{source_file}{suffix}.{extension}`，
/// 其中 suffix 对应滤波输出的命名约定（如 "_filtered"、"_medianfilter"）。
#[derive(Clone, Debug)]
pub struct DirLogSource {
    dir: PathBuf,
    format: LogFormat,
    suffix: String,
    extension: String,
}

impl DirLogSource {
    pub fn new(dir: impl Into<PathBuf>, format: LogFormat) -> Self {
        DirLogSource {
            dir: dir.into(),
            format,
            suffix: String::new(),
            extension: "txt".to_string(),
        }
    }

    /// 设置文件名后缀（拼在 source_file 与扩展名之间）
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// 设置扩展名（默认 "txt"）
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    fn path_for(&self, reference_point: &ReferencePoint) -> PathBuf {
        self.dir.join(format!(
            "{}{}.{}",
            reference_point.source_file, self.suffix, self.extension
        ))
    }
}

impl LogSource for DirLogSource {
    fn load(&self, reference_point: &ReferencePoint) -> Result<Vec<SignalSample>, PositioningError> {
        read_rssi_log(&self.path_for(reference_point), &self.format)
    }
}
