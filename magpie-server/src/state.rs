use backup_core::BackupEngine;
use std::sync::Arc;

/// 各处理器共享的应用状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BackupEngine>,
}
