/// Wi-Fi / BLE 指纹定位库
///
/// 支持的功能：
/// - RSSI 时间序列平滑（批量自适应卡尔曼滤波、中值滤波）
/// - 指纹数据库构建（逐参考点的平均信号向量）
/// - KNN 位置估计
/// - 估计误差评估与结果日志
///
/// 整条管线是离线批处理：原始扫描 → 平滑（可选）→ 按地址平均 →
/// 指纹数据库 / 观测向量 → KNN 估计 → 误差统计。

pub mod algorithms;
pub mod config;
pub mod error;
pub mod io;

pub use algorithms::*;
pub use config::RunConfig;
pub use error::PositioningError;
