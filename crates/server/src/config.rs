/// 配置管理

use common::models::constants;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub log_level: String,
    /// 对端主机上 Metricly 服务的端口
    pub peer_port: u16,
    /// 转发到对端时携带的 Bearer token
    pub peer_token: Option<String>,
    pub remote_timeout_secs: u64,
    /// Docker Engine API 地址
    pub docker_host: String,
    pub docker_timeout_secs: u64,
    pub cpu_sample_millis: u64,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port: u16 = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| constants::DEFAULT_SERVER_PORT.to_string())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://metricly.db?mode=rwc".to_string());

        let jwt_secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "change-me-in-production".to_string());

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let peer_port = match std::env::var("PEER_PORT") {
            Ok(port) => port.parse()?,
            Err(_) => server_port,
        };

        let peer_token = std::env::var("PEER_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        let remote_timeout_secs = std::env::var("REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| constants::DEFAULT_REMOTE_TIMEOUT_SECS.to_string())
            .parse()?;

        let docker_host = std::env::var("DOCKER_HOST")
            .unwrap_or_else(|_| "unix:///var/run/docker.sock".to_string());

        let docker_timeout_secs = std::env::var("DOCKER_TIMEOUT_SECS")
            .unwrap_or_else(|_| constants::DEFAULT_RUNTIME_TIMEOUT_SECS.to_string())
            .parse()?;

        let cpu_sample_millis = std::env::var("CPU_SAMPLE_MILLIS")
            .unwrap_or_else(|_| "200".to_string())
            .parse()?;

        Ok(Self {
            server_port,
            database_url,
            jwt_secret,
            log_level,
            peer_port,
            peer_token,
            remote_timeout_secs,
            docker_host,
            docker_timeout_secs,
            cpu_sample_millis,
        })
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn docker_timeout(&self) -> Duration {
        Duration::from_secs(self.docker_timeout_secs)
    }

    pub fn cpu_sample_interval(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_millis)
    }
}
