/// 指纹定位算法模块
///
/// 该模块提供指纹定位管线的核心算法，支持：
/// - RSSI 时间序列平滑（批量自适应卡尔曼滤波、中值滤波）
/// - 指纹数据库构建（逐参考点的平均信号向量，固定列序）
/// - KNN 位置估计
/// - 估计误差评估（平均误差 / 总体标准差）

pub mod builder;
pub mod evaluation;
pub mod fingerprint;
pub mod knn;
pub mod smoothing;

pub use builder::*;
pub use evaluation::*;
pub use fingerprint::*;
pub use knn::*;
pub use smoothing::*;
