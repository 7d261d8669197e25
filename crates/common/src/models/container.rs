use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::format_bytes;

/// 未知字段的占位值
const UNKNOWN: &str = "Unknown";

/// 单个容器的一次实时采集结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub name: String,
    /// 短 ID（12 位）
    pub id: String,
    pub status: String,
    pub image: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub memory_usage_display: String,
    pub memory_limit_display: String,
    /// 网卡名 -> 收发字节数
    pub network: BTreeMap<String, NetworkIo>,
    /// "80/tcp" -> 宿主机端口列表
    pub ports: BTreeMap<String, Vec<String>>,
    pub volumes: Vec<VolumeUsage>,
    pub size_root_fs: Option<u64>,
    pub created: String,
    pub uptime: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkIo {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// 挂载类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    Bind,
    Volume,
    Other,
}

impl MountKind {
    pub fn from_runtime(value: &str) -> Self {
        match value {
            "bind" => MountKind::Bind,
            "volume" => MountKind::Volume,
            _ => MountKind::Other,
        }
    }
}

/// 挂载点 / 数据卷占用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeUsage {
    pub kind: MountKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    pub destination: String,
    pub size_bytes: u64,
    pub size: String,
}

impl VolumeUsage {
    pub fn new(
        kind: MountKind,
        name: Option<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            kind,
            name,
            source: source.into(),
            destination: destination.into(),
            size_bytes,
            size: format_bytes(size_bytes),
        }
    }
}

impl ContainerSnapshot {
    /// 采集失败时的占位快照：保留名称与 ID，其余字段为零值或 "Unknown"
    pub fn placeholder(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            status: UNKNOWN.to_string(),
            image: UNKNOWN.to_string(),
            cpu_percent: 0.0,
            memory_usage: 0,
            memory_limit: 0,
            memory_percent: 0.0,
            memory_usage_display: format_bytes(0),
            memory_limit_display: format_bytes(0),
            network: BTreeMap::new(),
            ports: BTreeMap::new(),
            volumes: Vec::new(),
            size_root_fs: None,
            created: String::new(),
            uptime: UNKNOWN.to_string(),
        }
    }

    /// 所有网卡的收发字节合计
    pub fn network_totals(&self) -> NetworkIo {
        self.network.values().fold(NetworkIo::default(), |acc, io| NetworkIo {
            rx_bytes: acc.rx_bytes + io.rx_bytes,
            tx_bytes: acc.tx_bytes + io.tx_bytes,
        })
    }

    /// 占位快照（状态未知）
    pub fn is_placeholder(&self) -> bool {
        self.status == UNKNOWN
    }
}
