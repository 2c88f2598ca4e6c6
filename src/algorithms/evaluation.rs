/// 估计误差评估
///
/// 对一组 (观测, 真实位置) 的测试样本逐个调用 KNN 估计，
/// 汇总估计位置与真实位置之间的欧几里得误差。
/// 无法预测的样本被排除并单独计数；没有任何有效预测时，
/// 结果是显式的"无有效预测"状态，而不是数值 0 或 NaN。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::algorithms::fingerprint::{FingerprintDatabase, Observation, Position};
use crate::algorithms::knn::KnnEstimator;
use crate::algorithms::smoothing::{mean, SmoothingMethod};
use crate::config::RunConfig;
use crate::error::PositioningError;

/// 一条测试样本：观测 + 真实位置
#[derive(Clone, Debug)]
pub struct TestSample {
    pub observation: Observation,
    pub ground_truth: Position,
}

impl TestSample {
    pub fn new(observation: Observation, ground_truth: Position) -> Self {
        TestSample {
            observation,
            ground_truth,
        }
    }
}

/// 误差统计量
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ErrorStats {
    /// 平均误差
    pub mean_error: f64,
    /// 误差的总体标准差
    pub std_error: f64,
    /// 参与统计的样本数
    pub sample_count: usize,
}

/// 单次评估结果
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationResult {
    /// 方法标签（Raw / Median / Kalman）
    pub method: String,
    /// 使用的近邻数量
    pub k: usize,
    /// 误差统计；None 表示没有任何有效预测（区别于误差为 0）
    pub stats: Option<ErrorStats>,
    /// 被排除（无法预测）的样本数
    pub excluded: usize,
    /// 评估时间
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stats {
            Some(stats) => write!(
                f,
                "[{}] k={}: 平均误差 {:.2}, 标准差 {:.2} (样本 {}, 排除 {})",
                self.method,
                self.k,
                stats.mean_error,
                stats.std_error,
                stats.sample_count,
                self.excluded
            ),
            None => write!(
                f,
                "[{}] k={}: 无有效预测 (排除 {})",
                self.method, self.k, self.excluded
            ),
        }
    }
}

/// 评估器
#[derive(Clone, Debug)]
pub struct Evaluator {
    k: usize,
}

impl Evaluator {
    /// 创建评估器；k 为 0 时在此边界直接拒绝
    pub fn new(k: usize) -> Result<Self, PositioningError> {
        if k == 0 {
            return Err(PositioningError::InvalidK(k));
        }
        Ok(Evaluator { k })
    }

    /// 按运行配置创建评估器
    pub fn from_config(config: &RunConfig) -> Result<Self, PositioningError> {
        Evaluator::new(config.k)
    }

    /// 近邻数量
    pub fn k(&self) -> usize {
        self.k
    }

    /// 评估一组测试样本
    pub fn evaluate(
        &self,
        db: &FingerprintDatabase,
        test_set: &[TestSample],
        method: SmoothingMethod,
    ) -> EvaluationResult {
        let mut errors = Vec::new();
        let mut excluded = 0usize;

        for sample in test_set {
            match KnnEstimator::estimate(&sample.observation, db, self.k) {
                Ok(Some(estimate)) => {
                    errors.push(estimate.distance_to(&sample.ground_truth));
                }
                Ok(None) => {
                    warn!(method = %method, "样本无法估计（数据库为空），排除");
                    excluded += 1;
                }
                Err(error) => {
                    // k 在构造时已校验，这里只作为防线记录
                    warn!(method = %method, %error, "估计失败，排除该样本");
                    excluded += 1;
                }
            }
        }

        let stats = if errors.is_empty() {
            None
        } else {
            let mean_error = mean(&errors);
            Some(ErrorStats {
                mean_error,
                std_error: population_std(&errors, mean_error),
                sample_count: errors.len(),
            })
        };

        EvaluationResult {
            method: method.label().to_string(),
            k: self.k,
            stats,
            excluded,
            timestamp: Utc::now(),
        }
    }
}

/// 总体标准差（除以 n）
fn population_std(values: &[f64], mean_value: f64) -> f64 {
    let variance = values
        .iter()
        .map(|v| (v - mean_value) * (v - mean_value))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::fingerprint::FingerprintRecord;
    use std::collections::HashMap;

    fn record(rp_id: &str, x: f64, y: f64, pairs: &[(&str, f64)]) -> FingerprintRecord {
        let mut vector = HashMap::new();
        for (address, rssi) in pairs {
            vector.insert(address.to_string(), *rssi);
        }
        FingerprintRecord::new(rp_id.to_string(), x, y, vector)
    }

    #[test]
    fn test_exact_predictions_zero_error() {
        // 每条观测正好等于某个参考点的指纹，k=1 时预测与真实位置完全一致
        let db = FingerprintDatabase::assemble(
            vec![
                record("RP1", 0.0, 0.0, &[("m1", -50.0)]),
                record("RP2", 10.0, 0.0, &[("m1", -70.0)]),
            ],
            -100.0,
        );
        let test_set = vec![
            TestSample::new(
                Observation::from_pairs(vec![("m1", -50.0)]),
                Position::new(0.0, 0.0),
            ),
            TestSample::new(
                Observation::from_pairs(vec![("m1", -70.0)]),
                Position::new(10.0, 0.0),
            ),
        ];

        let evaluator = Evaluator::new(1).unwrap();
        let result = evaluator.evaluate(&db, &test_set, SmoothingMethod::Raw);
        let stats = result.stats.unwrap();
        assert_eq!(stats.mean_error, 0.0);
        assert_eq!(stats.std_error, 0.0);
        assert_eq!(stats.sample_count, 2);
        assert_eq!(result.excluded, 0);
    }

    #[test]
    fn test_empty_db_yields_no_valid_predictions() {
        let db = FingerprintDatabase::empty(-100.0);
        let test_set = vec![TestSample::new(
            Observation::from_pairs(vec![("m1", -50.0)]),
            Position::new(0.0, 0.0),
        )];

        let evaluator = Evaluator::new(3).unwrap();
        let result = evaluator.evaluate(&db, &test_set, SmoothingMethod::Raw);
        // "无有效预测"与"误差为 0"必须区分开
        assert!(result.stats.is_none());
        assert_eq!(result.excluded, 1);
    }

    #[test]
    fn test_empty_test_set() {
        let db = FingerprintDatabase::assemble(
            vec![record("RP1", 0.0, 0.0, &[("m1", -50.0)])],
            -100.0,
        );
        let evaluator = Evaluator::new(1).unwrap();
        let result = evaluator.evaluate(&db, &[], SmoothingMethod::Kalman);
        assert!(result.stats.is_none());
        assert_eq!(result.excluded, 0);
        assert_eq!(result.method, "Kalman");
    }

    #[test]
    fn test_evaluator_rejects_zero_k() {
        assert!(Evaluator::new(0).is_err());
    }

    #[test]
    fn test_error_statistics() {
        // RP1 在 (0,0)，观测都精确命中 RP1，但真实位置各不相同
        let db = FingerprintDatabase::assemble(
            vec![record("RP1", 0.0, 0.0, &[("m1", -50.0)])],
            -100.0,
        );
        let test_set = vec![
            TestSample::new(
                Observation::from_pairs(vec![("m1", -50.0)]),
                Position::new(3.0, 4.0), // 误差 5
            ),
            TestSample::new(
                Observation::from_pairs(vec![("m1", -50.0)]),
                Position::new(0.0, 1.0), // 误差 1
            ),
        ];

        let evaluator = Evaluator::new(1).unwrap();
        let result = evaluator.evaluate(&db, &test_set, SmoothingMethod::Raw);
        let stats = result.stats.unwrap();
        assert!((stats.mean_error - 3.0).abs() < 1e-9);
        // 总体标准差: sqrt(((5-3)^2 + (1-3)^2) / 2) = 2
        assert!((stats.std_error - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_result_serializes_to_json() {
        let result = EvaluationResult {
            method: "Kalman".to_string(),
            k: 3,
            stats: Some(ErrorStats {
                mean_error: 12.5,
                std_error: 2.25,
                sample_count: 8,
            }),
            excluded: 1,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"method\":\"Kalman\""));
        assert!(json.contains("\"mean_error\":12.5"));
        assert!(json.contains("\"timestamp\""));
    }

    #[test]
    fn test_display_distinguishes_no_data() {
        let result = EvaluationResult {
            method: "Raw".to_string(),
            k: 3,
            stats: None,
            excluded: 4,
            timestamp: Utc::now(),
        };
        assert!(result.to_string().contains("无有效预测"));
    }
}
