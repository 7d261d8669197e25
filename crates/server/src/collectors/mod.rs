/// 指标采集器
///
/// - 主机采集：本机直接读取操作系统信息，远程主机通过 HTTP 转发
/// - 容器采集：通过注入的容器运行时客户端读取本机容器状态

pub mod container;
pub mod docker;
pub mod system;

pub use container::ContainerCollector;
pub use docker::{ContainerRuntime, DockerClient, UnavailableRuntime};
pub use system::{HostCollector, SystemCollector};

#[cfg(test)]
pub mod testing {
    //! 测试用的采集器替身

    use async_trait::async_trait;
    use common::models::{MemoryInfo, SystemSnapshot};
    use common::{Error, HostAddr, Result};
    use serde_json::Value;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    use super::docker::{ContainerDetails, ContainerRuntime, ContainerStats, ContainerSummary};
    use super::system::HostCollector;

    pub fn snapshot_with_cpu(cpu_percent: f64) -> SystemSnapshot {
        SystemSnapshot {
            cpu_percent,
            cpu_count: 4,
            memory: MemoryInfo {
                total: 8 * 1024 * 1024 * 1024,
                percent: 50.0,
                ..Default::default()
            },
            disks: Default::default(),
            network: Default::default(),
            process_count: 100,
            uptime_seconds: 3600,
        }
    }

    /// 按顺序返回预设结果的主机采集器
    #[derive(Default)]
    pub struct ScriptedHostCollector {
        results: Mutex<VecDeque<Result<SystemSnapshot>>>,
    }

    impl ScriptedHostCollector {
        pub fn push_cpu(&self, cpu_percent: f64) {
            self.results
                .lock()
                .unwrap()
                .push_back(Ok(snapshot_with_cpu(cpu_percent)));
        }

        pub fn push_failure(&self, message: &str) {
            self.results
                .lock()
                .unwrap()
                .push_back(Err(Error::Collection(message.to_string())));
        }
    }

    #[async_trait]
    impl HostCollector for ScriptedHostCollector {
        async fn collect(&self, host: &HostAddr) -> Result<SystemSnapshot> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Collection(format!("{} 无可用结果", host))))
        }
    }

    /// 内存中的容器运行时
    #[derive(Default)]
    pub struct FakeRuntime {
        pub containers: Vec<ContainerSummary>,
        pub stats: HashMap<String, ContainerStats>,
        pub details: HashMap<String, ContainerDetails>,
        pub volumes: HashMap<String, u64>,
        pub failing: HashSet<String>,
        pub unavailable: bool,
    }

    impl FakeRuntime {
        /// 添加一个容器，stats 与 inspect 以 Docker API 的 JSON 形式给出
        pub fn with_container(mut self, id: &str, name: &str, stats: Value, details: Value) -> Self {
            self.containers.push(
                serde_json::from_value(serde_json::json!({
                    "Id": id,
                    "Names": [format!("/{}", name)],
                    "State": "running"
                }))
                .unwrap(),
            );
            self.stats.insert(id.to_string(), serde_json::from_value(stats).unwrap());
            self.details.insert(id.to_string(), serde_json::from_value(details).unwrap());
            self
        }

        pub fn failing(mut self, id: &str) -> Self {
            self.failing.insert(id.to_string());
            self
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn list_running(&self) -> Result<Vec<ContainerSummary>> {
            if self.unavailable {
                return Err(Error::Collection("容器运行时不可用".to_string()));
            }
            Ok(self.containers.clone())
        }

        async fn stats(&self, id: &str) -> Result<ContainerStats> {
            if self.failing.contains(id) {
                return Err(Error::Collection(format!("stats 失败: {}", id)));
            }
            self.stats
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.to_string()))
        }

        async fn inspect(&self, id: &str) -> Result<ContainerDetails> {
            self.details
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.to_string()))
        }

        async fn volume_usage(&self) -> Result<HashMap<String, u64>> {
            Ok(self.volumes.clone())
        }
    }
}
