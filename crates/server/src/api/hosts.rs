/// 主机管理接口

use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use validator::Validate;

use super::{bad_request, error_response, parse_host, ApiError, ApiResponse};
use crate::{
    app_state::AppState,
    db::models::host::{CreateHostDto, HostResponse},
    services::HostService,
};

/// 主机路由
pub fn host_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_hosts).post(create_host))
        .route("/:address", delete(delete_host))
}

/// 主机列表（本机在前）
pub async fn list_hosts(State(state): State<AppState>) -> Result<Json<Vec<HostResponse>>, ApiError> {
    let service = HostService::new(state);
    service.list().await.map(Json).map_err(error_response)
}

/// 注册主机
pub async fn create_host(
    State(state): State<AppState>,
    Json(dto): Json<CreateHostDto>,
) -> Result<Json<HostResponse>, ApiError> {
    if let Err(e) = dto.validate() {
        return Err(bad_request(format!("验证失败: {}", e)));
    }
    let host = parse_host(&dto.address)?;

    let service = HostService::new(state);
    service.register(&host).await.map(Json).map_err(error_response)
}

/// 注销主机及其全部数据
pub async fn delete_host(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let host = parse_host(&address)?;

    let service = HostService::new(state);
    let removed = service.remove(&host).await.map_err(error_response)?;

    Ok(Json(ApiResponse {
        success: true,
        message: format!("主机 {} 已删除，清理 {} 条样本", host, removed),
    }))
}
