use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 备份历史记录行
///
/// 与 backup_history 表一一对应，枚举字段保持字符串形态，
/// 类型化转换由上层门面完成。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecordRow {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub description: String,
    pub size_bytes: Option<i64>,
    pub error_text: Option<String>,
    /// JSON 数组文本
    pub replication_warnings: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
