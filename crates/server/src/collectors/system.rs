/// 主机指标采集
///
/// 本机使用 sysinfo 读取 CPU / 内存 / 磁盘 / 网络信息；
/// 远程主机转发到对端自身暴露的快照接口（对端运行同一服务）

use async_trait::async_trait;
use common::models::{DiskUsage, MemoryInfo, NetworkStats, SystemSnapshot};
use common::utils::{percent_of, round2};
use common::{Error, HostAddr, Result};
use std::collections::BTreeMap;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tracing::{debug, warn};

/// 对端暴露的快照接口路径
pub const SNAPSHOT_PATH: &str = "/api/metrics/snapshot";

/// 主机采集抽象
#[async_trait]
pub trait HostCollector: Send + Sync + 'static {
    /// 采集一台主机的实时快照
    async fn collect(&self, host: &HostAddr) -> Result<SystemSnapshot>;
}

/// 默认实现：本机 sysinfo + 远程 HTTP 转发
pub struct SystemCollector {
    http: reqwest::Client,
    peer_port: u16,
    peer_token: Option<String>,
    cpu_sample_interval: Duration,
}

impl SystemCollector {
    pub fn new(
        remote_timeout: Duration,
        peer_port: u16,
        peer_token: Option<String>,
        cpu_sample_interval: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(remote_timeout)
            .build()
            .map_err(|e| Error::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            http,
            peer_port,
            peer_token,
            cpu_sample_interval,
        })
    }

    /// 读取本机信息（在阻塞线程池中执行）
    pub async fn collect_local(&self) -> Result<SystemSnapshot> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(Error::Collection("当前操作系统不支持读取资源信息".to_string()));
        }

        let interval = self.cpu_sample_interval;
        tokio::task::spawn_blocking(move || read_local_snapshot(interval))
            .await
            .map_err(|e| Error::Collection(format!("读取本机资源信息失败: {}", e)))
    }

    /// 从对端的快照接口获取数据
    pub async fn fetch_remote(&self, base_url: &str) -> Result<SystemSnapshot> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), SNAPSHOT_PATH);
        debug!("转发主机指标请求: {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.peer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Collection(format!("请求对端超时: {}", url))
            } else {
                Error::Collection(format!("无法连接对端 {}: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Collection(format!("对端 {} 返回状态码 {}", url, status)));
        }

        response
            .json::<SystemSnapshot>()
            .await
            .map_err(|e| Error::Collection(format!("对端 {} 返回的快照无效: {}", url, e)))
    }

    fn peer_base_url(&self, host: &HostAddr) -> String {
        let address = host.as_str();
        if address.contains(':') {
            format!("http://[{}]:{}", address, self.peer_port)
        } else {
            format!("http://{}:{}", address, self.peer_port)
        }
    }
}

#[async_trait]
impl HostCollector for SystemCollector {
    async fn collect(&self, host: &HostAddr) -> Result<SystemSnapshot> {
        if host.is_local() {
            self.collect_local().await
        } else {
            let base_url = self.peer_base_url(host);
            self.fetch_remote(&base_url).await.map_err(|e| {
                warn!("远程主机 {} 采集失败: {}", host, e);
                e
            })
        }
    }
}

/// 同步读取本机快照
fn read_local_snapshot(cpu_sample_interval: Duration) -> SystemSnapshot {
    let mut sys = System::new_all();

    // CPU 使用率需要两次刷新之间的间隔
    std::thread::sleep(cpu_sample_interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();

    let total = sys.total_memory();
    let available = sys.available_memory();
    let memory = MemoryInfo {
        total,
        available,
        used: sys.used_memory(),
        free: sys.free_memory(),
        percent: percent_of(total.saturating_sub(available), total),
        swap_total: Some(sys.total_swap()),
        swap_used: Some(sys.used_swap()),
    };

    let disks = Disks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            let usage = DiskUsage {
                total,
                used,
                free,
                percent: percent_of(used, total),
                file_system: Some(disk.file_system().to_string_lossy().into_owned()),
            };
            (disk.mount_point().to_string_lossy().into_owned(), usage)
        })
        .collect::<BTreeMap<_, _>>();

    let network = Networks::new_with_refreshed_list()
        .list()
        .values()
        .fold(NetworkStats::default(), |mut acc, data| {
            acc.bytes_sent += data.total_transmitted();
            acc.bytes_recv += data.total_received();
            acc.packets_sent += data.total_packets_transmitted();
            acc.packets_recv += data.total_packets_received();
            acc.errin += data.total_errors_on_received();
            acc.errout += data.total_errors_on_transmitted();
            acc
        });

    SystemSnapshot {
        cpu_percent: round2(sys.global_cpu_usage() as f64),
        cpu_count: sys.cpus().len() as u32,
        memory,
        disks,
        network,
        process_count: sys.processes().len() as u64,
        uptime_seconds: System::uptime(),
    }
}
