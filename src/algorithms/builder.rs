/// 指纹数据库构建
///
/// 逐参考点读取 RSSI 日志，按设备地址分组、平滑并取平均，
/// 最后以固定列序组装成指纹数据库。单个参考点的数据缺陷
/// （日志缺失、无有效采样、重复标识符）只导致该点被跳过并记录，
/// 不会中断整体构建。

use std::collections::HashSet;

use tracing::warn;

use crate::algorithms::fingerprint::{
    average_by_address, FingerprintDatabase, FingerprintRecord, ReferencePoint, SignalSample,
};
use crate::algorithms::smoothing::SignalSmoother;
use crate::config::RunConfig;
use crate::error::PositioningError;

/// RSSI 日志来源（格式与路径解析由实现方负责）
pub trait LogSource {
    /// 读取一个参考点的全部 RSSI 采样
    fn load(&self, reference_point: &ReferencePoint) -> Result<Vec<SignalSample>, PositioningError>;
}

/// 构建结果：数据库 + 被跳过的参考点标识符
#[derive(Debug)]
pub struct BuildReport {
    pub database: FingerprintDatabase,
    pub skipped: Vec<String>,
}

/// 指纹数据库构建器
#[derive(Clone, Debug)]
pub struct FingerprintDatabaseBuilder {
    smoother: SignalSmoother,
    sentinel: f64,
}

impl FingerprintDatabaseBuilder {
    pub fn new(smoother: SignalSmoother, sentinel: f64) -> Self {
        FingerprintDatabaseBuilder { smoother, sentinel }
    }

    /// 按运行配置创建构建器
    pub fn from_config(config: &RunConfig) -> Self {
        use crate::algorithms::smoothing::{KalmanSmoother, MedianFilter};

        let smoother = SignalSmoother::with_filters(
            config.smoothing,
            KalmanSmoother::default(),
            MedianFilter::new(config.median_window),
        );
        FingerprintDatabaseBuilder::new(smoother, config.sentinel_rssi)
    }

    /// 构建指纹数据库
    ///
    /// 每个参考点：取日志、按地址分组、平滑、取平均；
    /// 处理完全部参考点后冻结列序并回填哨兵值。
    pub fn build(
        &self,
        reference_points: &[ReferencePoint],
        source: &dyn LogSource,
    ) -> BuildReport {
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for point in reference_points {
            if !seen_ids.insert(point.id.clone()) {
                warn!(rp_id = %point.id, "参考点标识符重复，跳过");
                skipped.push(point.id.clone());
                continue;
            }

            let samples = match source.load(point) {
                Ok(samples) => samples,
                Err(error) => {
                    warn!(rp_id = %point.id, %error, "读取参考点日志失败，跳过");
                    skipped.push(point.id.clone());
                    continue;
                }
            };

            let averaged = average_by_address(&samples, &self.smoother);
            if averaged.is_empty() {
                warn!(rp_id = %point.id, "参考点没有有效的 RSSI 采样，跳过");
                skipped.push(point.id.clone());
                continue;
            }

            records.push(FingerprintRecord::new(
                point.id.clone(),
                point.x,
                point.y,
                averaged,
            ));
        }

        BuildReport {
            database: FingerprintDatabase::assemble(records, self.sentinel),
            skipped,
        }
    }
}
