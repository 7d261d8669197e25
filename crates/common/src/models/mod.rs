/// 共享数据模型
///
/// 定义 Server 与对端主机共享的数据结构

mod container;
mod history;
mod snapshot;
mod threshold;

pub use container::{ContainerSnapshot, MountKind, NetworkIo, VolumeUsage};
pub use history::{DataPoint, SamplePayload};
pub use snapshot::{DiskUsage, MemoryInfo, NetworkStats, SystemSnapshot};
pub use threshold::{Alert, AlertMetric, ThresholdLevels};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::errors::{Error, Result};

/// 被监控主机的网络地址
///
/// 所有"是否为本机"的判断都集中在这里；本机的各种别名统一规范为 `localhost`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostAddr(String);

impl HostAddr {
    /// 本机
    pub fn local() -> Self {
        Self(constants::LOCAL_HOST.to_string())
    }

    /// 解析并校验主机地址
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("主机地址不能为空".to_string()));
        }
        if trimmed.len() > 253 {
            return Err(Error::InvalidArgument(format!("主机地址过长: {}", trimmed)));
        }

        if Self::is_local_alias(trimmed) {
            return Ok(Self::local());
        }

        if trimmed.parse::<IpAddr>().is_ok() {
            return Ok(Self(trimmed.to_string()));
        }

        let valid_hostname = trimmed.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
        if !valid_hostname {
            return Err(Error::InvalidArgument(format!("无效的主机地址: {}", trimmed)));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// 是否为本机（隐式存在、不可删除）
    pub fn is_local(&self) -> bool {
        self.0 == constants::LOCAL_HOST
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_local_alias(raw: &str) -> bool {
        if raw.eq_ignore_ascii_case(constants::LOCAL_HOST) {
            return true;
        }
        matches!(raw.parse::<IpAddr>(), Ok(ip) if ip.is_loopback())
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HostAddr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HostAddr> for String {
    fn from(host: HostAddr) -> Self {
        host.0
    }
}

/// 指标类型：主机级 `system` 或容器级 `docker_<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    System,
    Container(String),
}

impl MetricKind {
    pub fn container(name: impl Into<String>) -> Self {
        MetricKind::Container(name.into())
    }

    /// 存储中使用的字符串形式
    pub fn as_db_value(&self) -> String {
        match self {
            MetricKind::System => constants::SYSTEM_KIND.to_string(),
            MetricKind::Container(name) => {
                format!("{}{}", constants::CONTAINER_KIND_PREFIX, name)
            }
        }
    }

    /// 从存储字符串还原
    pub fn from_db_value(value: &str) -> Option<Self> {
        if value == constants::SYSTEM_KIND {
            return Some(MetricKind::System);
        }
        value
            .strip_prefix(constants::CONTAINER_KIND_PREFIX)
            .filter(|name| !name.is_empty())
            .map(|name| MetricKind::Container(name.to_string()))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_db_value())
    }
}

/// 常量定义
pub mod constants {
    /// 默认 Server 端口
    pub const DEFAULT_SERVER_PORT: u16 = 3000;

    /// 远程主机转发超时（秒）
    pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 5;

    /// 本地容器运行时调用超时（秒）
    pub const DEFAULT_RUNTIME_TIMEOUT_SECS: u64 = 10;

    /// 未配置时的告警阈值（百分比）
    pub const DEFAULT_THRESHOLD: f64 = 80.0;

    /// 本机的规范名称
    pub const LOCAL_HOST: &str = "localhost";

    /// 主机级指标类型
    pub const SYSTEM_KIND: &str = "system";

    /// 容器级指标类型前缀
    pub const CONTAINER_KIND_PREFIX: &str = "docker_";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_addr_local_aliases() {
        for alias in ["localhost", "LocalHost", "127.0.0.1", "::1", "[::1]", " 127.0.0.1 "] {
            let host = HostAddr::parse(alias).unwrap();
            assert!(host.is_local(), "{} should be local", alias);
            assert_eq!(host.as_str(), "localhost");
        }
    }

    #[test]
    fn test_host_addr_remote() {
        let host = HostAddr::parse("10.0.0.5").unwrap();
        assert!(!host.is_local());
        assert_eq!(host.to_string(), "10.0.0.5");

        let host = HostAddr::parse("Web-01.Example.com").unwrap();
        assert_eq!(host.as_str(), "web-01.example.com");

        assert!(HostAddr::parse("fe80::1").is_ok());
    }

    #[test]
    fn test_host_addr_invalid() {
        assert!(HostAddr::parse("").is_err());
        assert!(HostAddr::parse("   ").is_err());
        assert!(HostAddr::parse("bad host").is_err());
        assert!(HostAddr::parse("-leading.example").is_err());
        assert!(HostAddr::parse("a..b").is_err());
    }

    #[test]
    fn test_host_addr_serde() {
        let host: HostAddr = serde_json::from_str("\"127.0.0.1\"").unwrap();
        assert!(host.is_local());
        assert!(serde_json::from_str::<HostAddr>("\"not valid!\"").is_err());
        assert_eq!(serde_json::to_string(&host).unwrap(), "\"localhost\"");
    }

    #[test]
    fn test_metric_kind_db_value() {
        assert_eq!(MetricKind::System.as_db_value(), "system");
        assert_eq!(MetricKind::container("redis").as_db_value(), "docker_redis");
        assert_eq!(MetricKind::from_db_value("system"), Some(MetricKind::System));
        assert_eq!(
            MetricKind::from_db_value("docker_web"),
            Some(MetricKind::container("web"))
        );
        assert_eq!(MetricKind::from_db_value("docker_"), None);
        assert_eq!(MetricKind::from_db_value("cpu"), None);
    }
}
