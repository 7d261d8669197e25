/// Metricly - Server
///
/// 多主机指标仪表盘后端，提供 REST API 服务

mod api;
mod app_state;
mod collectors;
mod config;
mod db;
mod middleware;
mod services;
mod telemetry;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    app_state::AppState,
    collectors::{
        ContainerCollector, ContainerRuntime, DockerClient, HostCollector, SystemCollector,
        UnavailableRuntime,
    },
    db::{establish_connection, init_schema},
    telemetry::Telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 加载配置
    let cfg = config::Config::from_env()?;

    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level)),
        )
        .init();

    info!("🚀 启动 Metricly Server...");
    info!("✅ 配置加载成功");

    // 建立数据库连接并建表
    let sea_db = establish_connection(&cfg.database_url).await?;
    init_schema(&sea_db).await?;
    info!("✅ 数据库初始化成功");

    // 初始化采集器
    let host_collector: Arc<dyn HostCollector> = Arc::new(SystemCollector::new(
        cfg.remote_timeout(),
        cfg.peer_port,
        cfg.peer_token.clone(),
        cfg.cpu_sample_interval(),
    )?);
    let runtime: Arc<dyn ContainerRuntime> =
        match DockerClient::new(&cfg.docker_host, cfg.docker_timeout()) {
            Ok(client) => {
                info!("✅ Docker 运行时: {}", client.endpoint());
                Arc::new(client)
            }
            Err(e) => {
                warn!("⚠️ Docker 运行时不可用，容器指标将为空: {}", e);
                Arc::new(UnavailableRuntime::new(e.to_string()))
            }
        };
    let container_collector = Arc::new(ContainerCollector::new(runtime));
    info!("✅ 采集器初始化成功");

    let telemetry = Arc::new(Telemetry::new()?);

    // 创建应用状态
    let app_state = AppState::new(
        sea_db,
        host_collector,
        container_collector,
        telemetry,
        cfg.jwt_secret.clone(),
    );

    // 设置CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 构建应用路由
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/internal/metrics", get(api::metrics::prometheus_metrics))
        .nest("/api", api::api_routes(app_state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // 启动服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.server_port));
    info!("🎯 服务器监听在 http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> &'static str {
    "Metricly Server API v1"
}

async fn health_handler() -> &'static str {
    "OK"
}
