/// 错误类型定义
///
/// 错误处理分两层：
/// - 逐行/逐点的数据缺陷（无法解析的数值、缺失的日志文件）在内部吸收，
///   记录警告后跳过，不会中断整个批处理
/// - 结构性无效调用（k 值非法、缺少必需的元数据文件）向调用方传播

use std::path::PathBuf;
use thiserror::Error;

/// 定位管线错误
#[derive(Error, Debug)]
pub enum PositioningError {
    /// KNN 的 k 值必须为正整数
    #[error("无效的 k 值: {0}（必须大于 0）")]
    InvalidK(usize),

    /// 文件不存在
    #[error("文件缺失: {}", .0.display())]
    MissingFile(PathBuf),

    /// 表头缺少必需列
    #[error("文件 {} 表头缺少必需列: {column}", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// IO 错误
    #[error("IO 错误 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV 读写错误
    #[error("CSV 错误: {0}")]
    Csv(#[from] csv::Error),

    /// 配置解析错误
    #[error("配置解析错误: {0}")]
    Config(#[from] serde_json::Error),

    /// 设备地址过滤正则无效
    #[error("无效的地址过滤表达式: {0}")]
    AddressPattern(#[from] regex::Error),
}
