use crate::{MagpieError, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

use super::actor::MagpieDbActor;
use super::messages::DbMessage;
use super::models::BackupRecordRow;

/// 备份历史数据库管理器
///
/// 可克隆的异步句柄，内部通过消息通道与独占连接的 Actor 通信。
#[derive(Debug, Clone)]
pub struct MagpieDbManager {
    sender: mpsc::Sender<DbMessage>,
}

impl MagpieDbManager {
    /// 创建新的数据库管理器
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // 确保数据库文件的父目录存在
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (sender, receiver) = mpsc::channel(100);

        // 启动数据库 Actor
        let actor = MagpieDbActor::new(db_path)?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 创建内存数据库管理器
    pub async fn new_memory() -> Result<Self> {
        let (sender, receiver) = mpsc::channel(100);

        // 启动数据库 Actor（内存模式）
        let actor = MagpieDbActor::new_memory()?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 初始化数据库表
    async fn init_tables(&self) -> Result<()> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::InitTables { respond_to })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }

    /// 插入进行中的备份记录
    pub async fn insert_backup_record(
        &self,
        id: String,
        kind: String,
        status: String,
        description: String,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::InsertBackupRecord {
                id,
                kind,
                status,
                description,
                created_at,
                respond_to,
            })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }

    /// 备份成功的终态转移
    pub async fn complete_backup_record(
        &self,
        id: String,
        size_bytes: i64,
        replication_warnings: String,
        finished_at: DateTime<Utc>,
    ) -> Result<()> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::CompleteBackupRecord {
                id,
                size_bytes,
                replication_warnings,
                finished_at,
                respond_to,
            })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }

    /// 备份失败的终态转移
    pub async fn fail_backup_record(
        &self,
        id: String,
        error_text: String,
        replication_warnings: String,
        finished_at: DateTime<Utc>,
    ) -> Result<()> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::FailBackupRecord {
                id,
                error_text,
                replication_warnings,
                finished_at,
                respond_to,
            })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }

    /// 获取最近的备份记录
    pub async fn get_recent_backups(&self, limit: usize) -> Result<Vec<BackupRecordRow>> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::GetRecentBackups { limit, respond_to })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }

    /// 根据ID获取备份记录
    pub async fn get_backup_by_id(&self, id: String) -> Result<Option<BackupRecordRow>> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(DbMessage::GetBackupById { id, respond_to })
            .await
            .map_err(|_| MagpieError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MagpieError::custom("等待数据库响应超时"))?
    }
}
