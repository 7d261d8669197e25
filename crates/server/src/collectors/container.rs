/// 容器指标采集器
///
/// 只针对本机容器运行时；单个容器失败时返回占位快照，不影响其他容器

use chrono::{DateTime, Utc};
use common::models::{ContainerSnapshot, MountKind, VolumeUsage};
use common::utils::{format_bytes, format_uptime, percent_of, round2};
use common::Result;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::docker::{ContainerRuntime, ContainerStats, ContainerSummary, PortBinding};

/// 未发布端口的显示值
const NOT_EXPOSED: &str = "Not Exposed";

pub struct ContainerCollector {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerCollector {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// 采集所有运行中容器
    pub async fn collect(&self) -> Result<Vec<ContainerSnapshot>> {
        let containers = self.runtime.list_running().await?;
        debug!("发现 {} 个运行中的容器", containers.len());

        let volume_sizes = match self.runtime.volume_usage().await {
            Ok(sizes) => sizes,
            Err(e) => {
                warn!("获取数据卷占用失败: {}", e);
                HashMap::new()
            }
        };

        let now = Utc::now();
        let snapshots = join_all(
            containers
                .iter()
                .map(|summary| self.collect_one(summary, &volume_sizes, now)),
        )
        .await;

        info!("容器采集完成: {} 个", snapshots.len());
        Ok(snapshots)
    }

    async fn collect_one(
        &self,
        summary: &ContainerSummary,
        volume_sizes: &HashMap<String, u64>,
        now: DateTime<Utc>,
    ) -> ContainerSnapshot {
        match self.try_collect_one(summary, volume_sizes, now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("获取容器 {} 的指标失败: {}", summary.name(), e);
                ContainerSnapshot::placeholder(summary.name(), summary.short_id())
            }
        }
    }

    async fn try_collect_one(
        &self,
        summary: &ContainerSummary,
        volume_sizes: &HashMap<String, u64>,
        now: DateTime<Utc>,
    ) -> Result<ContainerSnapshot> {
        let (stats, details) = tokio::try_join!(
            self.runtime.stats(&summary.id),
            self.runtime.inspect(&summary.id)
        )?;

        let mut volumes = Vec::with_capacity(details.mounts.len());
        for mount in &details.mounts {
            let kind = MountKind::from_runtime(&mount.kind);
            let size_bytes = match kind {
                MountKind::Bind => dir_size(PathBuf::from(&mount.source)).await,
                MountKind::Volume => mount
                    .name
                    .as_ref()
                    .and_then(|name| volume_sizes.get(name))
                    .copied()
                    .unwrap_or(0),
                MountKind::Other => 0,
            };
            volumes.push(VolumeUsage::new(
                kind,
                mount.name.clone(),
                &mount.source,
                &mount.destination,
                size_bytes,
            ));
        }

        let memory_usage = stats.memory_stats.usage;
        let memory_limit = stats.memory_stats.limit;
        let status = if details.state.status.is_empty() {
            summary.state.clone().unwrap_or_else(|| "Unknown".to_string())
        } else {
            details.state.status.clone()
        };
        let image = details
            .config
            .image
            .clone()
            .or_else(|| summary.image.clone())
            .filter(|image| !image.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        Ok(ContainerSnapshot {
            name: summary.name(),
            id: summary.short_id(),
            status,
            image,
            cpu_percent: cpu_percent(&stats),
            memory_usage,
            memory_limit,
            memory_percent: percent_of(memory_usage, memory_limit),
            memory_usage_display: format_bytes(memory_usage),
            memory_limit_display: format_bytes(memory_limit),
            network: stats.networks.clone(),
            ports: format_ports(details.network_settings.ports.as_ref()),
            volumes,
            size_root_fs: details.size_root_fs,
            uptime: container_uptime(&details.created, now),
            created: details.created,
        })
    }
}

/// 容器 CPU 使用率
///
/// `(cpu_delta / system_delta) * 在线核数 * 100`；缺少上一窗口数据或 system_delta <= 0 时为 0
pub fn cpu_percent(stats: &ContainerStats) -> f64 {
    let current = &stats.cpu_stats;
    let previous = &stats.precpu_stats;

    let (Some(cpu_now), Some(cpu_prev), Some(sys_now), Some(sys_prev)) = (
        current.cpu_usage.total_usage,
        previous.cpu_usage.total_usage,
        current.system_cpu_usage,
        previous.system_cpu_usage,
    ) else {
        return 0.0;
    };

    let cpu_delta = cpu_now as f64 - cpu_prev as f64;
    let system_delta = sys_now as f64 - sys_prev as f64;
    if system_delta <= 0.0 || cpu_delta < 0.0 {
        return 0.0;
    }

    let cores = current
        .online_cpus
        .filter(|n| *n > 0)
        .or_else(|| {
            current
                .cpu_usage
                .percpu_usage
                .as_ref()
                .map(|per_cpu| per_cpu.len() as u32)
                .filter(|n| *n > 0)
        })
        .unwrap_or(1);

    round2(cpu_delta / system_delta * cores as f64 * 100.0)
}

/// 端口映射："80/tcp" -> 宿主机端口；未发布的端口显示为 "Not Exposed"
pub fn format_ports(
    ports: Option<&BTreeMap<String, Option<Vec<PortBinding>>>>,
) -> BTreeMap<String, Vec<String>> {
    let Some(ports) = ports else {
        return BTreeMap::new();
    };

    ports
        .iter()
        .map(|(port, bindings)| {
            let host_ports = match bindings {
                Some(bindings) if !bindings.is_empty() => bindings
                    .iter()
                    .map(|binding| binding.host_port.clone())
                    .collect(),
                _ => vec![NOT_EXPOSED.to_string()],
            };
            (port.clone(), host_ports)
        })
        .collect()
}

/// 根据创建时间计算运行时长，无法解析时返回 "Unknown"
pub fn container_uptime(created: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(created) {
        Ok(created_at) => format_uptime(now - created_at.with_timezone(&Utc)),
        Err(e) => {
            debug!("无法解析容器创建时间 {:?}: {}", created, e);
            "Unknown".to_string()
        }
    }
}

/// 绑定挂载目录下所有文件的大小之和；出错时记录日志并返回 0
pub async fn dir_size(path: PathBuf) -> u64 {
    let mount_path = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || -> std::result::Result<u64, walkdir::Error> {
        let mut total = 0u64;
        for entry in WalkDir::new(&path) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    })
    .await;

    match result {
        Ok(Ok(total)) => total,
        Ok(Err(e)) => {
            warn!("计算挂载目录 {} 大小失败: {}", mount_path, e);
            0
        }
        Err(e) => {
            warn!("计算挂载目录 {} 大小的任务失败: {}", mount_path, e);
            0
        }
    }
}
