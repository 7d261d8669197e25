/// 告警阈值接口

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use common::models::ThresholdLevels;
use validator::Validate;

use super::{bad_request, error_response, parse_host, ApiError};
use crate::{
    app_state::AppState,
    db::models::threshold::{ThresholdResponse, UpdateThresholdDto},
    services::{HostService, ThresholdService},
};

pub fn threshold_routes() -> Router<AppState> {
    Router::new().route("/:address/thresholds", get(get_thresholds).put(update_thresholds))
}

pub async fn get_thresholds(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ThresholdResponse>, ApiError> {
    let host = parse_host(&address)?;
    HostService::new(state.clone())
        .ensure_known(&host)
        .await
        .map_err(error_response)?;

    let service = ThresholdService::new(state.sea_db());
    service.get(&host).await.map(Json).map_err(error_response)
}

/// 设置阈值，取值必须在 0..=100
pub async fn update_thresholds(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(dto): Json<UpdateThresholdDto>,
) -> Result<Json<ThresholdResponse>, ApiError> {
    if let Err(e) = dto.validate() {
        return Err(bad_request(format!("验证失败: {}", e)));
    }
    let host = parse_host(&address)?;
    HostService::new(state.clone())
        .ensure_known(&host)
        .await
        .map_err(error_response)?;

    let levels = ThresholdLevels {
        cpu: dto.cpu_threshold,
        memory: dto.memory_threshold,
        disk: dto.disk_threshold,
    };
    let service = ThresholdService::new(state.sea_db());
    service.set(&host, levels).await.map(Json).map_err(error_response)
}
