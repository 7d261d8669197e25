use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::container::{ContainerSnapshot, NetworkIo};
use super::snapshot::{DiskUsage, MemoryInfo, NetworkStats, SystemSnapshot};

/// 样本中保存的原始详情（按类型打标签）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplePayload {
    System {
        memory: MemoryInfo,
        disks: BTreeMap<String, DiskUsage>,
        network: NetworkStats,
        #[serde(default)]
        process_count: u64,
        #[serde(default)]
        uptime_seconds: u64,
    },
    Container {
        memory_usage: u64,
        memory_limit: u64,
        network: BTreeMap<String, NetworkIo>,
        #[serde(default)]
        status: String,
    },
}

impl SamplePayload {
    /// 收发字节合计 (rx, tx)
    pub fn network_totals(&self) -> (u64, u64) {
        match self {
            SamplePayload::System { network, .. } => (network.bytes_recv, network.bytes_sent),
            SamplePayload::Container { network, .. } => network
                .values()
                .fold((0, 0), |(rx, tx), io| (rx + io.rx_bytes, tx + io.tx_bytes)),
        }
    }
}

impl From<&SystemSnapshot> for SamplePayload {
    fn from(snapshot: &SystemSnapshot) -> Self {
        SamplePayload::System {
            memory: snapshot.memory.clone(),
            disks: snapshot.disks.clone(),
            network: snapshot.network.clone(),
            process_count: snapshot.process_count,
            uptime_seconds: snapshot.uptime_seconds,
        }
    }
}

impl From<&ContainerSnapshot> for SamplePayload {
    fn from(snapshot: &ContainerSnapshot) -> Self {
        SamplePayload::Container {
            memory_usage: snapshot.memory_usage,
            memory_limit: snapshot.memory_limit,
            network: snapshot.network.clone(),
            status: snapshot.status.clone(),
        }
    }
}

/// 图表使用的单个数据点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    /// 主值：CPU 使用率
    pub cpu_percent: f64,
    pub memory_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub network_rx_bytes: Option<u64>,
    pub network_tx_bytes: Option<u64>,
    /// 是否来自本次实时采集
    pub live: bool,
}

impl DataPoint {
    pub fn from_system(snapshot: &SystemSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at,
            cpu_percent: snapshot.cpu_percent,
            memory_percent: Some(snapshot.memory.percent),
            disk_percent: Some(snapshot.primary_disk_percent()),
            network_rx_bytes: Some(snapshot.network.bytes_recv),
            network_tx_bytes: Some(snapshot.network.bytes_sent),
            live: true,
        }
    }

    pub fn from_container(snapshot: &ContainerSnapshot, at: DateTime<Utc>) -> Self {
        let totals = snapshot.network_totals();
        Self {
            timestamp: at,
            cpu_percent: snapshot.cpu_percent,
            memory_percent: Some(snapshot.memory_percent),
            disk_percent: None,
            network_rx_bytes: Some(totals.rx_bytes),
            network_tx_bytes: Some(totals.tx_bytes),
            live: true,
        }
    }
}
