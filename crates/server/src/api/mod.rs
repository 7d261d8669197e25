pub mod hosts;
pub mod metrics;
pub mod thresholds;

use axum::{http::StatusCode, middleware::from_fn_with_state, Json, Router};
use common::{Error, HostAddr};
use serde::Serialize;
use tracing::error;

use crate::{app_state::AppState, middleware::auth_middleware};

/// 通用响应
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// 所有 API 路由（统一入口，均需认证）
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest(
            "/hosts",
            hosts::host_routes()
                .merge(metrics::host_metric_routes())
                .merge(thresholds::threshold_routes()),
        )
        .nest("/metrics", metrics::peer_routes())
        .layer(from_fn_with_state(state, auth_middleware))
}

/// 业务错误映射为 HTTP 状态码
pub fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::AlreadyExists(_) => StatusCode::CONFLICT,
        Error::Rejected(_) | Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::Collection(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("请求处理失败: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            success: false,
            error: e.to_string(),
        }),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
}

/// 解析路径中的主机地址
pub fn parse_host(raw: &str) -> Result<HostAddr, ApiError> {
    HostAddr::parse(raw).map_err(error_response)
}
