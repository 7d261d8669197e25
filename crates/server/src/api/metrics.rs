/// 指标查询接口

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use common::models::SystemSnapshot;
use common::HostAddr;
use serde::Deserialize;

use super::{error_response, parse_host, ApiError};
use crate::{
    app_state::AppState,
    services::metrics_service::{
        parse_time_range, ContainerHistoryResponse, ContainerOverviewResponse, LiveSystemResponse,
        MetricsService, SystemHistoryResponse, DEFAULT_TIME_RANGE,
    },
};

/// `/hosts/:address/...` 下的指标路由
pub fn host_metric_routes() -> Router<AppState> {
    Router::new()
        .route("/:address/metrics", get(system_history))
        .route("/:address/metrics/system", get(live_system))
        .route("/:address/docker", get(container_overview))
        .route("/:address/docker/metrics", get(container_history))
}

/// 供其他 Metricly 实例转发调用的本机快照
pub fn peer_routes() -> Router<AppState> {
    Router::new().route("/snapshot", get(local_snapshot))
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeQuery {
    #[serde(rename = "timeRange")]
    pub time_range: Option<String>,
}

impl TimeRangeQuery {
    fn window(&self) -> Result<chrono::Duration, ApiError> {
        parse_time_range(self.time_range.as_deref().unwrap_or(DEFAULT_TIME_RANGE))
            .map_err(error_response)
    }
}

pub async fn live_system(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<LiveSystemResponse>, ApiError> {
    let host = parse_host(&address)?;
    let service = MetricsService::new(state);
    service.live_system(&host).await.map(Json).map_err(error_response)
}

pub async fn system_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<SystemHistoryResponse>, ApiError> {
    let host = parse_host(&address)?;
    let window = query.window()?;
    let service = MetricsService::new(state);
    service
        .system_history(&host, window)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn container_overview(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ContainerOverviewResponse>, ApiError> {
    let host = parse_host(&address)?;
    let service = MetricsService::new(state);
    service
        .container_overview(&host)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn container_history(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<TimeRangeQuery>,
) -> Result<Json<ContainerHistoryResponse>, ApiError> {
    let host = parse_host(&address)?;
    let window = query.window()?;
    let service = MetricsService::new(state);
    service
        .container_history(&host, window)
        .await
        .map(Json)
        .map_err(error_response)
}

/// 采集本机快照，不写入存储
pub async fn local_snapshot(State(state): State<AppState>) -> Result<Json<SystemSnapshot>, ApiError> {
    state
        .host_collector()
        .collect(&HostAddr::local())
        .await
        .map(Json)
        .map_err(error_response)
}

/// Prometheus 文本格式的服务自身指标
pub async fn prometheus_metrics(State(state): State<AppState>) -> String {
    state.telemetry.render()
}
