use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// 主机的一次实时采集结果
///
/// 除 `cpu_percent` 外，其余字段在远程响应中缺失或格式错误时都会回退为零值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub cpu_count: u32,
    #[serde(default, deserialize_with = "lenient_object")]
    pub memory: MemoryInfo,
    /// 挂载点 -> 磁盘使用详情
    #[serde(default, deserialize_with = "lenient_disks")]
    pub disks: BTreeMap<String, DiskUsage>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub network: NetworkStats,
    #[serde(default, deserialize_with = "lenient")]
    pub process_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub uptime_seconds: u64,
}

/// 内存详情（字节）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryInfo {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_used: Option<u64>,
}

/// 单个挂载点的磁盘使用情况（字节）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_system: Option<String>,
}

/// 网络计数器（所有网卡累计）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkStats {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
}

impl SystemSnapshot {
    /// 用于历史曲线的主磁盘使用率：优先根分区，否则取最高的挂载点
    pub fn primary_disk_percent(&self) -> f64 {
        self.disks
            .get("/")
            .map(|disk| disk.percent)
            .unwrap_or_else(|| self.max_disk_percent())
    }

    /// 所有挂载点中最高的使用率
    pub fn max_disk_percent(&self) -> f64 {
        self.disks
            .values()
            .map(|disk| disk.percent)
            .fold(0.0, f64::max)
    }
}

/// 宽松反序列化：子结构格式错误时记录日志并使用默认值
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            warn!("快照子结构格式错误，使用默认值: {}", e);
            Ok(T::default())
        }
    }
}

/// 只接受 JSON 对象的子结构；数组等其他形式不能按位置映射到字段
fn object_or_default<T>(value: Value, what: &str) -> T
where
    T: DeserializeOwned + Default,
{
    if !value.is_object() {
        if !value.is_null() {
            warn!("{} 不是对象，使用默认值: {}", what, value);
        }
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("{} 格式错误，使用默认值: {}", what, e);
        T::default()
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(object_or_default(value, "快照子结构"))
}

/// 磁盘表：整体必须是对象，单个挂载点格式错误时只丢弃该挂载点
fn lenient_disks<'de, D>(deserializer: D) -> Result<BTreeMap<String, DiskUsage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Object(entries) => entries,
        Value::Null => return Ok(BTreeMap::new()),
        other => {
            warn!("disks 不是对象，使用默认值: {}", other);
            return Ok(BTreeMap::new());
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|(mount, usage)| {
            if !usage.is_object() {
                warn!("挂载点 {} 的磁盘数据格式错误，已忽略", mount);
                return None;
            }
            match serde_json::from_value::<DiskUsage>(usage) {
                Ok(usage) => Some((mount, usage)),
                Err(e) => {
                    warn!("挂载点 {} 的磁盘数据格式错误，已忽略: {}", mount, e);
                    None
                }
            }
        })
        .collect())
}
