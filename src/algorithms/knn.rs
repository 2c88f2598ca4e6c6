/// KNN 位置估计
///
/// 在指纹数据库的固定列序下，计算观测向量与各参考点信号向量的
/// 欧几里得距离，取最近 k 个参考点坐标的算术平均作为位置估计。

use std::cmp::Ordering;

use crate::algorithms::fingerprint::{FingerprintDatabase, Observation, Position};
use crate::error::PositioningError;

/// KNN 估计器
pub struct KnnEstimator;

impl KnnEstimator {
    /// 估计观测的位置
    ///
    /// # 参数
    /// - `observation`: 未知位置的平均信号观测（可以是部分的，
    ///   缺失列以数据库的哨兵值代替；与数据库零重叠的观测仍会
    ///   产生一个（很可能不准的）估计，这是有意的降级行为）
    /// - `db`: 指纹数据库
    /// - `k`: 近邻数量，超过记录数时取全部记录
    ///
    /// # 返回
    /// - `Ok(None)` 表示数据库为空、无法估计
    /// - `Err` 仅在 k 为 0 时出现
    pub fn estimate(
        observation: &Observation,
        db: &FingerprintDatabase,
        k: usize,
    ) -> Result<Option<Position>, PositioningError> {
        if k == 0 {
            return Err(PositioningError::InvalidK(k));
        }
        if db.is_empty() {
            return Ok(None);
        }

        let ranked = ranked_indices(observation, db);
        let take = k.min(ranked.len());

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for &(_, index) in ranked.iter().take(take) {
            let record = &db.records()[index];
            sum_x += record.x;
            sum_y += record.y;
        }

        Ok(Some(Position::new(
            sum_x / take as f64,
            sum_y / take as f64,
        )))
    }

    /// 各参考点按距离升序的 (rp_id, 距离) 列表
    ///
    /// 距离相同的参考点保持插入顺序（稳定排序），保证结果可复现。
    pub fn rank(observation: &Observation, db: &FingerprintDatabase) -> Vec<(String, f64)> {
        ranked_indices(observation, db)
            .into_iter()
            .map(|(distance, index)| (db.records()[index].rp_id.clone(), distance))
            .collect()
    }
}

fn ranked_indices(observation: &Observation, db: &FingerprintDatabase) -> Vec<(f64, usize)> {
    let observation_vector = db.observation_vector(observation);

    let mut scored: Vec<(f64, usize)> = db
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let record_vector = db.record_vector(record);
            (euclidean(&record_vector, &observation_vector), index)
        })
        .collect();

    // 稳定排序：距离相同时保持插入顺序
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    scored
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
