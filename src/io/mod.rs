/// 数据交换模块
///
/// RSSI 日志读取与各类表格（参考点元数据、指纹数据库、评估结果日志）
/// 的读写。核心算法只消费/产出数据结构，不关心磁盘格式。

pub mod logs;
pub mod tables;

pub use logs::*;
pub use tables::*;
