/// RSSI 信号平滑滤波
///
/// 支持：
/// - 批量自适应卡尔曼滤波（Q/R 由整条序列的统计量推导）
/// - 滑动窗口中值滤波
/// - 不平滑（直接使用原始值）
///
/// 注意：卡尔曼滤波是离线批处理滤波器，参数推导需要先拿到完整序列，
/// 再做前向滤波，不能用于逐样本增长的在线流式场景。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 平滑方式标签
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMethod {
    /// 不平滑，直接使用原始值
    #[default]
    Raw,
    /// 滑动窗口中值滤波
    Median,
    /// 批量自适应卡尔曼滤波
    Kalman,
}

impl SmoothingMethod {
    /// 方法标签（用于结果日志的 method 列）
    pub fn label(&self) -> &'static str {
        match self {
            SmoothingMethod::Raw => "Raw",
            SmoothingMethod::Median => "Median",
            SmoothingMethod::Kalman => "Kalman",
        }
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// 批量自适应卡尔曼滤波
// ============================================================================

/// 一次滤波调用推导出的参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanParams {
    /// 过程噪声协方差
    pub q: f64,
    /// 测量噪声协方差
    pub r: f64,
    /// 初始状态估计
    pub x0: f64,
    /// 初始误差协方差
    pub p0: f64,
}

/// 滤波瞬态状态（仅在一次 smooth 调用内有效，不跨序列保留）
#[derive(Clone, Copy, Debug)]
struct KalmanState {
    x: f64,
    p: f64,
}

/// 批量自适应一维卡尔曼滤波器（恒等动力学模型）
///
/// 两阶段计算：
/// 1. 由整条序列推导 Q、R 和初始状态
/// 2. 按序做标准的预测-更新前向滤波
///
/// 噪声越大的序列 R 越大、平滑越重，无需单独的标定步骤。
#[derive(Clone, Debug)]
pub struct KalmanSmoother {
    /// 过程噪声相对信号方差的比例
    pub q_ratio: f64,
    /// 初始状态估计使用的开头样本数
    pub init_window: usize,
}

impl Default for KalmanSmoother {
    fn default() -> Self {
        KalmanSmoother {
            q_ratio: 0.01,
            init_window: 3,
        }
    }
}

impl KalmanSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第一阶段：由整条序列推导滤波参数
    ///
    /// 信号方差取整条序列的总体方差；不足 2 个样本或方差恰好为零时
    /// 退化为 1.0（否则 Q = R = 0 会在第二步产生 0/0 的增益）。
    pub fn derive_params(&self, values: &[f64]) -> KalmanParams {
        let signal_var = if values.len() < 2 {
            1.0
        } else {
            let v = population_variance(values);
            if v > 0.0 { v } else { 1.0 }
        };

        let window = self.init_window.max(1).min(values.len().max(1));
        let init_values = if values.is_empty() {
            &[][..]
        } else {
            &values[..window]
        };
        let x0 = if init_values.is_empty() {
            0.0
        } else {
            mean(init_values)
        };
        let init_var = if init_values.is_empty() {
            0.0
        } else {
            population_variance(init_values)
        };
        let p0 = if init_var > 0.0 { init_var } else { 1.0 };

        KalmanParams {
            q: self.q_ratio * signal_var,
            r: signal_var,
            x0,
            p0,
        }
    }

    /// 第二阶段：按序前向滤波
    ///
    /// 输出与输入等长、同序；空输入返回空输出。
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }

        let params = self.derive_params(values);
        let mut state = KalmanState {
            x: params.x0,
            p: params.p0,
        };
        let mut result = Vec::with_capacity(values.len());

        for &z in values {
            // 预测
            let p_pred = state.p + params.q;

            // 卡尔曼增益
            let k = p_pred / (p_pred + params.r);

            // 更新
            state.x += k * (z - state.x);
            state.p = (1.0 - k) * p_pred;

            result.push(state.x);
        }

        result
    }
}

// ============================================================================
// 中值滤波
// ============================================================================

/// 滑动窗口中值滤波器
///
/// 窗口以当前样本为中心，序列边缘处窗口被截断。
#[derive(Clone, Debug)]
pub struct MedianFilter {
    /// 窗口大小（建议奇数）
    pub window: usize,
}

impl Default for MedianFilter {
    fn default() -> Self {
        MedianFilter { window: 5 }
    }
}

impl MedianFilter {
    pub fn new(window: usize) -> Self {
        MedianFilter { window }
    }

    /// 对一条序列做中值滤波，输出与输入等长、同序
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        if values.is_empty() || self.window <= 1 {
            return values.to_vec();
        }

        let half = self.window / 2;
        (0..values.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(values.len());
                median(&values[lo..hi])
            })
            .collect()
    }
}

// ============================================================================
// 统一平滑入口
// ============================================================================

/// 按配置的平滑方式处理一条序列
#[derive(Clone, Debug, Default)]
pub struct SignalSmoother {
    method: SmoothingMethod,
    kalman: KalmanSmoother,
    median: MedianFilter,
}

impl SignalSmoother {
    /// 创建指定平滑方式的平滑器，滤波器参数取默认值
    pub fn new(method: SmoothingMethod) -> Self {
        SignalSmoother {
            method,
            kalman: KalmanSmoother::default(),
            median: MedianFilter::default(),
        }
    }

    /// 创建自定义滤波器参数的平滑器
    pub fn with_filters(method: SmoothingMethod, kalman: KalmanSmoother, median: MedianFilter) -> Self {
        SignalSmoother {
            method,
            kalman,
            median,
        }
    }

    /// 当前平滑方式
    pub fn method(&self) -> SmoothingMethod {
        self.method
    }

    /// 平滑一条序列
    pub fn smooth(&self, values: &[f64]) -> Vec<f64> {
        match self.method {
            SmoothingMethod::Raw => values.to_vec(),
            SmoothingMethod::Median => self.median.smooth(values),
            SmoothingMethod::Kalman => self.kalman.smooth(values),
        }
    }
}

// ============================================================================
// 统计辅助函数
// ============================================================================

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// 总体方差（除以 n，不做自由度修正）
pub(crate) fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
