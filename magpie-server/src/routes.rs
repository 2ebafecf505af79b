use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use backup_core::BackupEngine;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// 装配HTTP路由
///
/// 仪表盘前端消费这组接口；跨域保持宽松（本地部署，单管理员）。
pub fn create_router(engine: Arc<BackupEngine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/backup/config",
            get(handlers::get_config).post(handlers::update_config),
        )
        .route("/backup/history", get(handlers::get_history))
        .route("/backup/create", post(handlers::create_backup))
        .route("/backup/test-github", get(handlers::test_github))
        .route("/backup/test-google-drive", get(handlers::test_google_drive))
        .route("/backup/download/{id}", post(handlers::download_backup))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
