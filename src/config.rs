/// 运行配置
///
/// 所有运行参数（近邻数量、哨兵值、平滑方式等）以不可变配置的形式
/// 在构造时传入各组件，同一进程内可并存多组不同参数的运行。

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::algorithms::SmoothingMethod;
use crate::error::PositioningError;

/// 默认哨兵值：某个设备地址未被观测到时的占位 RSSI（dBm）
pub const DEFAULT_SENTINEL_RSSI: f64 = -100.0;

/// 默认近邻数量
pub const DEFAULT_K: usize = 3;

/// 默认中值滤波窗口大小
pub const DEFAULT_MEDIAN_WINDOW: usize = 5;

/// 一次评估运行的完整配置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// KNN 的近邻数量
    #[serde(default = "default_k")]
    pub k: usize,
    /// 未观测地址的哨兵 RSSI 值
    #[serde(default = "default_sentinel")]
    pub sentinel_rssi: f64,
    /// 信号平滑方式
    #[serde(default)]
    pub smoothing: SmoothingMethod,
    /// 中值滤波窗口大小（仅在 smoothing = median 时生效）
    #[serde(default = "default_median_window")]
    pub median_window: usize,
    /// 设备地址过滤正则（None 表示保留所有地址）
    #[serde(default)]
    pub address_pattern: Option<String>,
}

fn default_k() -> usize {
    DEFAULT_K
}

fn default_sentinel() -> f64 {
    DEFAULT_SENTINEL_RSSI
}

fn default_median_window() -> usize {
    DEFAULT_MEDIAN_WINDOW
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            k: DEFAULT_K,
            sentinel_rssi: DEFAULT_SENTINEL_RSSI,
            smoothing: SmoothingMethod::Raw,
            median_window: DEFAULT_MEDIAN_WINDOW,
            address_pattern: None,
        }
    }
}

impl RunConfig {
    /// 创建指定平滑方式的配置，其余参数取默认值
    pub fn with_smoothing(smoothing: SmoothingMethod) -> Self {
        RunConfig {
            smoothing,
            ..Default::default()
        }
    }

    /// 从 JSON 文件加载配置（缺省字段取默认值）
    pub fn from_json_file(path: &Path) -> Result<Self, PositioningError> {
        let text = fs::read_to_string(path).map_err(|source| PositioningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置参数
    pub fn validate(&self) -> Result<(), PositioningError> {
        if self.k == 0 {
            return Err(PositioningError::InvalidK(self.k));
        }
        self.address_filter()?;
        Ok(())
    }

    /// 编译配置中的地址过滤正则（未配置时返回 None）
    pub fn address_filter(&self) -> Result<Option<Regex>, PositioningError> {
        match &self.address_pattern {
            Some(pattern) => Ok(Some(Regex::new(pattern)?)),
            None => Ok(None),
        }
    }
}
