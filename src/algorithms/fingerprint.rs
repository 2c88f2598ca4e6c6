/// 指纹定位的核心数据结构
///
/// 包括：
/// - 单条 RSSI 采样与按地址平均后的观测向量
/// - 参考点定义
/// - 指纹记录与指纹数据库（固定列序的平均信号向量集合）

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithms::smoothing::{mean, SignalSmoother};

/// 单条 RSSI 采样
#[derive(Clone, Debug)]
pub struct SignalSample {
    /// 设备 MAC 地址或唯一标识符
    pub device_address: String,
    /// RSSI 值（dBm）
    pub rssi: f64,
    /// 时间戳（可选，原样保留日志中的字符串）
    pub timestamp: Option<String>,
}

impl SignalSample {
    pub fn new(device_address: String, rssi: f64) -> Self {
        SignalSample {
            device_address,
            rssi,
            timestamp: None,
        }
    }

    pub fn with_timestamp(device_address: String, rssi: f64, timestamp: String) -> Self {
        SignalSample {
            device_address,
            rssi,
            timestamp: Some(timestamp),
        }
    }
}

/// 二维位置
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    /// 与另一位置的欧几里得距离
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// 参考点：采集指纹时的已知位置
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// 唯一标识符
    #[serde(rename = "ID")]
    pub id: String,
    /// X 坐标
    #[serde(rename = "X")]
    pub x: f64,
    /// Y 坐标
    #[serde(rename = "Y")]
    pub y: f64,
    /// 对应 RSSI 日志的文件名（不含后缀与扩展名）
    #[serde(rename = "File")]
    pub source_file: String,
}

impl ReferencePoint {
    pub fn new(id: String, x: f64, y: f64, source_file: String) -> Self {
        ReferencePoint {
            id,
            x,
            y,
            source_file,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// 未知位置的一次扫描：设备地址 -> 平均 RSSI 的映射（可以是部分的）
#[derive(Clone, Debug, Default)]
pub struct Observation {
    readings: HashMap<String, f64>,
}

impl Observation {
    /// 创建空观测
    pub fn new() -> Self {
        Observation {
            readings: HashMap::new(),
        }
    }

    /// 从 (地址, RSSI) 对的向量创建
    pub fn from_pairs(pairs: Vec<(&str, f64)>) -> Self {
        let mut observation = Observation::new();
        for (address, rssi) in pairs {
            observation.add(address.to_string(), rssi);
        }
        observation
    }

    /// 从 HashMap 创建
    pub fn from_hashmap(map: HashMap<String, f64>) -> Self {
        Observation { readings: map }
    }

    /// 从原始采样创建：按地址分组，各序列先平滑再取算术平均
    pub fn from_samples(samples: &[SignalSample], smoother: &SignalSmoother) -> Self {
        Observation {
            readings: average_by_address(samples, smoother),
        }
    }

    /// 添加一条平均读数
    pub fn add(&mut self, device_address: String, rssi: f64) {
        self.readings.insert(device_address, rssi);
    }

    /// 获取某地址的平均 RSSI
    pub fn get(&self, device_address: &str) -> Option<f64> {
        self.readings.get(device_address).copied()
    }

    /// 所有读数
    pub fn all(&self) -> &HashMap<String, f64> {
        &self.readings
    }

    /// 读数数量
    pub fn count(&self) -> usize {
        self.readings.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// 是否包含某地址
    pub fn contains(&self, device_address: &str) -> bool {
        self.readings.contains_key(device_address)
    }
}

/// 按地址分组并取平均；每个地址的序列在平均前先经过平滑器
pub(crate) fn average_by_address(
    samples: &[SignalSample],
    smoother: &SignalSmoother,
) -> HashMap<String, f64> {
    let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();
    for sample in samples {
        grouped
            .entry(sample.device_address.clone())
            .or_default()
            .push(sample.rssi);
    }

    let mut averaged = HashMap::new();
    for (address, series) in grouped {
        let smoothed = smoother.smooth(&series);
        if smoothed.is_empty() {
            continue;
        }
        averaged.insert(address, mean(&smoothed));
    }
    averaged
}

/// 一条指纹记录：参考点坐标 + 平均信号向量
#[derive(Clone, Debug)]
pub struct FingerprintRecord {
    /// 参考点标识符
    pub rp_id: String,
    /// X 坐标
    pub x: f64,
    /// Y 坐标
    pub y: f64,
    /// 设备地址 -> 平均 RSSI（组装后对数据库列集是全集）
    pub signal_vector: HashMap<String, f64>,
}

impl FingerprintRecord {
    pub fn new(rp_id: String, x: f64, y: f64, signal_vector: HashMap<String, f64>) -> Self {
        FingerprintRecord {
            rp_id,
            x,
            y,
            signal_vector,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// 某列的平均 RSSI
    pub fn rssi(&self, device_address: &str) -> Option<f64> {
        self.signal_vector.get(device_address).copied()
    }
}

/// 指纹数据库
///
/// 不变量：
/// - 列集 = 所有记录中出现过的设备地址的有序并集
/// - 每条记录的信号向量对列集是全集，缺失项以哨兵值回填（没有 NaN）
/// - rp_id 在数据库内唯一
///
/// 构建完成后只读，供估计与评估共享。
#[derive(Clone, Debug)]
pub struct FingerprintDatabase {
    columns: Vec<String>,
    records: Vec<FingerprintRecord>,
    sentinel: f64,
}

impl FingerprintDatabase {
    /// 由各参考点的平均信号向量组装数据库
    ///
    /// 列序固定为所有出现过的设备地址按字典序排序；每条记录的缺失列
    /// 以哨兵值回填，保证之后的向量构造不会出现缺项。
    pub fn assemble(mut records: Vec<FingerprintRecord>, sentinel: f64) -> Self {
        let all_addresses: BTreeSet<String> = records
            .iter()
            .flat_map(|record| record.signal_vector.keys().cloned())
            .collect();
        let columns: Vec<String> = all_addresses.into_iter().collect();

        for record in &mut records {
            for column in &columns {
                record
                    .signal_vector
                    .entry(column.clone())
                    .or_insert(sentinel);
            }
        }

        FingerprintDatabase {
            columns,
            records,
            sentinel,
        }
    }

    /// 创建空数据库
    pub fn empty(sentinel: f64) -> Self {
        FingerprintDatabase {
            columns: Vec::new(),
            records: Vec::new(),
            sentinel,
        }
    }

    /// 固定的列序（有序的设备地址并集）
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 所有记录（按插入顺序）
    pub fn records(&self) -> &[FingerprintRecord] {
        &self.records
    }

    /// 哨兵值
    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按参考点标识符查找记录
    pub fn get(&self, rp_id: &str) -> Option<&FingerprintRecord> {
        self.records.iter().find(|record| record.rp_id == rp_id)
    }

    /// 按列序构造一条记录的信号向量
    pub fn record_vector(&self, record: &FingerprintRecord) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| record.rssi(column).unwrap_or(self.sentinel))
            .collect()
    }

    /// 按列序构造观测向量，观测中缺失的列以哨兵值代替
    pub fn observation_vector(&self, observation: &Observation) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| observation.get(column).unwrap_or(self.sentinel))
            .collect()
    }
}
