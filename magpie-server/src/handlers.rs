use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backup_core::config::ConfigPatch;
use backup_core::{
    ArchiveInfo, BackupConfiguration, BackupRecord, MagpieError, ProbeResult, constants,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 统一的API响应信封
///
/// 成功: `{"success": true, "data": ...}`
/// 失败: `{"success": false, "error": "..."}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// 错误分类映射到HTTP状态码，响应体保持统一信封
pub struct ApiError(MagpieError);

impl From<MagpieError> for ApiError {
    fn from(e: MagpieError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MagpieError::Config(_) | MagpieError::ConfigNotFound => StatusCode::BAD_REQUEST,
            MagpieError::NotFound(_) => StatusCode::NOT_FOUND,
            MagpieError::BackupInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
}

/// 存活检查
pub async fn health() -> Json<ApiResponse<HealthData>> {
    ApiResponse::ok(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 读取当前配置
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<BackupConfiguration>> {
    ApiResponse::ok(state.engine.configuration().await)
}

/// 浅合并更新配置，返回合并后的完整配置
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<ApiResponse<BackupConfiguration>>, ApiError> {
    let updated = state.engine.update_configuration(patch).await?;
    Ok(ApiResponse::ok(updated))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// 备份历史，时间倒序
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<BackupRecord>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(constants::api::DEFAULT_HISTORY_LIMIT);
    let records = state.engine.list_history(limit).await?;
    Ok(ApiResponse::ok(records))
}

/// 立即执行一次备份，返回最终记录
pub async fn create_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<BackupRecord>>, ApiError> {
    let record = state.engine.create_backup().await?;
    Ok(ApiResponse::ok(record))
}

/// github 连通性检查
pub async fn test_github(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ProbeResult>> {
    ApiResponse::ok(state.engine.test_git_connection().await)
}

/// Google Drive 连通性检查
pub async fn test_google_drive(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ProbeResult>> {
    ApiResponse::ok(state.engine.test_drive_connection().await)
}

/// 打包指定快照，返回归档信息
pub async fn download_backup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ArchiveInfo>>, ApiError> {
    let archive = state.engine.download_backup(&id).await?;
    Ok(ApiResponse::ok(archive))
}
