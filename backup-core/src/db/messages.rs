use crate::Result;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::models::BackupRecordRow;

/// 备份历史数据库操作消息
#[derive(Debug)]
pub enum DbMessage {
    /// 初始化数据库表
    InitTables {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 插入一条进行中的备份记录
    InsertBackupRecord {
        id: String,
        kind: String,
        status: String,
        description: String,
        created_at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 备份成功，写入终态
    CompleteBackupRecord {
        id: String,
        size_bytes: i64,
        replication_warnings: String,
        finished_at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 备份失败，写入终态
    FailBackupRecord {
        id: String,
        error_text: String,
        replication_warnings: String,
        finished_at: DateTime<Utc>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 获取最近的备份记录（时间倒序）
    GetRecentBackups {
        limit: usize,
        respond_to: oneshot::Sender<Result<Vec<BackupRecordRow>>>,
    },
    /// 根据ID获取备份记录
    GetBackupById {
        id: String,
        respond_to: oneshot::Sender<Result<Option<BackupRecordRow>>>,
    },
}
