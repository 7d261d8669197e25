/// 容器运行时抽象层
///
/// 定义统一的容器运行时接口，默认实现通过 Unix socket 或 TCP 访问 Docker Engine API

use async_trait::async_trait;
use common::models::NetworkIo;
use common::utils::parse_bytes;
use common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use hyper::body::Bytes;
use hyper::StatusCode;
#[cfg(unix)]
use http_body_util::{BodyExt, Empty};
#[cfg(unix)]
use hyper::{header, Request};
#[cfg(unix)]
use hyper_util::rt::TokioIo;
#[cfg(unix)]
use tokio::net::UnixStream;

/// 运行中容器的列表项 (`GET /containers/json`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl ContainerSummary {
    /// 容器名（去掉前导 `/`），缺失时使用短 ID
    pub fn name(&self) -> String {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.short_id())
    }

    pub fn short_id(&self) -> String {
        self.id.chars().take(12).collect()
    }
}

/// 单次资源统计 (`GET /containers/{id}/stats?stream=false`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub cpu_stats: CpuStats,
    /// 上一统计窗口
    #[serde(default)]
    pub precpu_stats: CpuStats,
    #[serde(default)]
    pub memory_stats: MemoryStats,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkIo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub cpu_usage: CpuUsage,
    pub system_cpu_usage: Option<u64>,
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CpuUsage {
    pub total_usage: Option<u64>,
    pub percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: u64,
    #[serde(default)]
    pub limit: u64,
}

/// 容器描述 (`GET /containers/{id}/json`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerDetails {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// ISO-8601 创建时间（UTC）
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub state: ContainerState,
    #[serde(default)]
    pub config: ContainerConfig,
    #[serde(default)]
    pub network_settings: NetworkSettings,
    #[serde(default)]
    pub mounts: Vec<MountPoint>,
    #[serde(default)]
    pub size_root_fs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerState {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSettings {
    /// "80/tcp" -> 绑定列表（未发布时为 null）
    #[serde(default)]
    pub ports: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    #[serde(default)]
    pub host_ip: Option<String>,
    #[serde(default)]
    pub host_port: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountPoint {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
}

/// 容器运行时 Trait
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// 列出运行中的容器
    async fn list_running(&self) -> Result<Vec<ContainerSummary>>;

    /// 获取单次（非流式）资源统计
    async fn stats(&self, id: &str) -> Result<ContainerStats>;

    /// 获取容器描述（挂载、端口、创建时间等）
    async fn inspect(&self, id: &str) -> Result<ContainerDetails>;

    /// 命名数据卷占用：卷名 -> 字节数
    async fn volume_usage(&self) -> Result<HashMap<String, u64>>;
}

/// Docker Engine API 的访问地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// 本机 Unix socket（Docker 的默认监听方式）
    Unix(PathBuf),
    /// 开放了 TCP 端口的 Engine API
    Http(String),
}

impl DockerEndpoint {
    /// 解析 `DOCKER_HOST`：`unix://`、`tcp://`、`http(s)://`
    pub fn parse(docker_host: &str) -> Result<Self> {
        let trimmed = docker_host.trim();
        if let Some(path) = trimmed.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::Config(format!("DOCKER_HOST 缺少 socket 路径: {}", docker_host)));
            }
            return Ok(DockerEndpoint::Unix(PathBuf::from(path)));
        }

        let trimmed = trimmed.trim_end_matches('/');
        if let Some(rest) = trimmed.strip_prefix("tcp://") {
            return Ok(DockerEndpoint::Http(format!("http://{}", rest)));
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Ok(DockerEndpoint::Http(trimmed.to_string()));
        }
        Err(Error::Config(format!("不支持的 DOCKER_HOST: {}", docker_host)))
    }
}

impl fmt::Display for DockerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            DockerEndpoint::Http(base_url) => f.write_str(base_url),
        }
    }
}

/// Docker Engine API 客户端
pub struct DockerClient {
    endpoint: DockerEndpoint,
    http: reqwest::Client,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(docker_host: &str, timeout: Duration) -> Result<Self> {
        let endpoint = DockerEndpoint::parse(docker_host)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("创建 Docker 客户端失败: {}", e)))?;

        Ok(Self {
            endpoint,
            http,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &DockerEndpoint {
        &self.endpoint
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("Docker API 请求: {}{}", self.endpoint, path);

        let (status, body) = match &self.endpoint {
            DockerEndpoint::Http(base_url) => self.http_get(base_url, path).await?,
            DockerEndpoint::Unix(socket_path) => {
                tokio::time::timeout(self.timeout, unix_get(socket_path, path))
                    .await
                    .map_err(|_| Error::Collection(format!("Docker API 请求超时: {}", path)))??
            }
        };

        if !status.is_success() {
            return Err(Error::Collection(format!(
                "Docker API {} 返回状态码 {}",
                path, status
            )));
        }

        serde_json::from_slice(&body)
            .map_err(|e| Error::Collection(format!("Docker API {} 响应无效: {}", path, e)))
    }

    async fn http_get(&self, base_url: &str, path: &str) -> Result<(StatusCode, Bytes)> {
        let response = self
            .http
            .get(format!("{}{}", base_url, path))
            .send()
            .await
            .map_err(|e| Error::Collection(format!("Docker API 请求失败 {}: {}", path, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Collection(format!("读取 Docker API {} 响应失败: {}", path, e)))?;
        Ok((status, body))
    }
}

/// 通过 Unix socket 发送一次 HTTP/1.1 GET
#[cfg(unix)]
async fn unix_get(socket_path: &Path, path: &str) -> Result<(StatusCode, Bytes)> {
    let socket_error = |e: &dyn fmt::Display| {
        Error::Collection(format!("无法访问 Docker socket {}: {}", socket_path.display(), e))
    };

    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| socket_error(&e))?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| socket_error(&e))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Docker socket 连接结束: {}", e);
        }
    });

    let request = Request::get(path)
        .header(header::HOST, "docker")
        .body(Empty::<Bytes>::new())
        .map_err(|e| Error::Internal(format!("构造 Docker 请求失败: {}", e)))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| Error::Collection(format!("Docker API 请求失败 {}: {}", path, e)))?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| Error::Collection(format!("读取 Docker API {} 响应失败: {}", path, e)))?
        .to_bytes();
    Ok((status, body))
}

#[cfg(not(unix))]
async fn unix_get(socket_path: &Path, _path: &str) -> Result<(StatusCode, Bytes)> {
    Err(Error::Collection(format!(
        "当前平台不支持 Unix socket: {}",
        socket_path.display()
    )))
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn list_running(&self) -> Result<Vec<ContainerSummary>> {
        self.get_json("/containers/json").await
    }

    async fn stats(&self, id: &str) -> Result<ContainerStats> {
        self.get_json(&format!("/containers/{}/stats?stream=false", id)).await
    }

    async fn inspect(&self, id: &str) -> Result<ContainerDetails> {
        self.get_json(&format!("/containers/{}/json?size=true", id)).await
    }

    async fn volume_usage(&self) -> Result<HashMap<String, u64>> {
        let usage: Value = self.get_json("/system/df").await?;
        Ok(parse_volume_usage(&usage))
    }
}

/// `DOCKER_HOST` 无效时使用：所有调用都返回采集错误，容器查询退化为空
pub struct UnavailableRuntime {
    reason: String,
}

impl UnavailableRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> Error {
        Error::Collection(format!("容器运行时不可用: {}", self.reason))
    }
}

#[async_trait]
impl ContainerRuntime for UnavailableRuntime {
    async fn list_running(&self) -> Result<Vec<ContainerSummary>> {
        Err(self.error())
    }

    async fn stats(&self, _id: &str) -> Result<ContainerStats> {
        Err(self.error())
    }

    async fn inspect(&self, _id: &str) -> Result<ContainerDetails> {
        Err(self.error())
    }

    async fn volume_usage(&self) -> Result<HashMap<String, u64>> {
        Err(self.error())
    }
}

/// 解析 `/system/df` 中的数据卷占用；大小可能是数字、-1（未知）或 "12.5 MB" 形式的字符串
fn parse_volume_usage(df: &Value) -> HashMap<String, u64> {
    let volumes = match df.get("Volumes").and_then(Value::as_array) {
        Some(volumes) => volumes,
        None => return HashMap::new(),
    };

    volumes
        .iter()
        .filter_map(|volume| {
            let name = volume.get("Name")?.as_str()?.to_string();
            let size = match volume.pointer("/UsageData/Size") {
                Some(Value::Number(n)) => n.as_i64().filter(|size| *size >= 0).unwrap_or(0) as u64,
                Some(Value::String(s)) => parse_bytes(s) as u64,
                _ => {
                    warn!("数据卷 {} 未报告占用大小", name);
                    0
                }
            };
            Some((name, size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            DockerEndpoint::parse("unix:///var/run/docker.sock").unwrap(),
            DockerEndpoint::Unix(PathBuf::from("/var/run/docker.sock"))
        );
        assert_eq!(
            DockerEndpoint::parse("tcp://10.0.0.2:2375").unwrap(),
            DockerEndpoint::Http("http://10.0.0.2:2375".to_string())
        );
        assert_eq!(
            DockerEndpoint::parse("http://127.0.0.1:2375/").unwrap(),
            DockerEndpoint::Http("http://127.0.0.1:2375".to_string())
        );
        assert!(matches!(DockerEndpoint::parse("unix://"), Err(Error::Config(_))));
        assert!(matches!(DockerEndpoint::parse("ftp://docker"), Err(Error::Config(_))));
    }

    /// 在 Unix socket 上应答一次请求，返回收到的请求头
    #[cfg(unix)]
    fn serve_once(
        socket_path: &Path,
        body: &'static str,
    ) -> tokio::task::JoinHandle<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::UnixListener::bind(socket_path).unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_running_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("docker.sock");
        let server = serve_once(&socket_path, r#"[{"Id": "abc123", "Names": ["/web"]}]"#);

        let client = DockerClient::new(
            &format!("unix://{}", socket_path.display()),
            Duration::from_secs(5),
        )
        .unwrap();
        let containers = client.list_running().await.unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name(), "web");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /containers/json HTTP/1.1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unix_socket_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("docker.sock");
        let listener = tokio::net::UnixListener::bind(&socket_path).unwrap();
        let _silent = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let client = DockerClient::new(
            &format!("unix://{}", socket_path.display()),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(matches!(client.list_running().await, Err(Error::Collection(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_socket_is_collection_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = DockerClient::new(
            &format!("unix://{}", dir.path().join("absent.sock").display()),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.volume_usage().await.unwrap_err();
        assert!(err.is_collection());
    }

    #[tokio::test]
    async fn test_unavailable_runtime_degrades() {
        let runtime = UnavailableRuntime::new("不支持的 DOCKER_HOST: ftp://docker");
        assert!(matches!(runtime.list_running().await, Err(Error::Collection(_))));
        assert!(matches!(runtime.inspect("abc").await, Err(Error::Collection(_))));

        let collector = crate::collectors::ContainerCollector::new(std::sync::Arc::new(runtime));
        assert!(collector.collect().await.unwrap_err().is_collection());
    }

    #[test]
    fn test_summary_name() {
        let summary: ContainerSummary = serde_json::from_value(json!({
            "Id": "0123456789abcdef0123",
            "Names": ["/redis"],
        }))
        .unwrap();
        assert_eq!(summary.name(), "redis");
        assert_eq!(summary.short_id(), "0123456789ab");

        let unnamed: ContainerSummary = serde_json::from_value(json!({"Id": "abcdef"})).unwrap();
        assert_eq!(unnamed.name(), "abcdef");
    }

    #[test]
    fn test_parse_volume_usage() {
        let df = json!({
            "Volumes": [
                {"Name": "pgdata", "UsageData": {"Size": 2048, "RefCount": 1}},
                {"Name": "cache", "UsageData": {"Size": -1, "RefCount": 0}},
                {"Name": "legacy", "UsageData": {"Size": "1.5 KB"}},
                {"Name": "bare"}
            ]
        });
        let usage = parse_volume_usage(&df);
        assert_eq!(usage["pgdata"], 2048);
        assert_eq!(usage["cache"], 0);
        assert_eq!(usage["legacy"], 1536);
        assert_eq!(usage["bare"], 0);
        assert!(parse_volume_usage(&json!({})).is_empty());
    }

    #[test]
    fn test_details_with_unpublished_ports() {
        let details: ContainerDetails = serde_json::from_value(json!({
            "Id": "abc",
            "Name": "/web",
            "Created": "2024-01-01T00:00:00.123456789Z",
            "State": {"Status": "running"},
            "Config": {"Image": "nginx:latest"},
            "NetworkSettings": {"Ports": {"80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}], "443/tcp": null}},
            "Mounts": [{"Type": "bind", "Source": "/srv", "Destination": "/data"}]
        }))
        .unwrap();
        let ports = details.network_settings.ports.unwrap();
        assert!(ports["443/tcp"].is_none());
        assert_eq!(details.mounts[0].kind, "bind");
        assert_eq!(details.size_root_fs, None);
    }
}
