use crate::Result;
use crate::error::MagpieError;
use chrono::{DateTime, Utc};
use duckdb::{Connection, Row, params};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::DbMessage;
use super::models::BackupRecordRow;

/// 备份历史 Actor - 确保单线程访问DuckDB
pub struct MagpieDbActor {
    connection: Connection,
}

impl MagpieDbActor {
    /// 创建新的数据库 Actor
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let connection = Connection::open(db_path)?;
        Ok(Self { connection })
    }

    /// 创建内存数据库 Actor
    pub fn new_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    /// 运行Actor消息循环
    pub async fn run(mut self, mut receiver: mpsc::Receiver<DbMessage>) {
        info!("备份历史数据库 Actor 已启动");

        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }

        info!("备份历史数据库 Actor 已关闭");
    }

    /// 处理数据库消息
    fn handle_message(&mut self, message: DbMessage) {
        match message {
            DbMessage::InitTables { respond_to } => {
                let result = self.init_tables();
                let _ = respond_to.send(result);
            }
            DbMessage::InsertBackupRecord {
                id,
                kind,
                status,
                description,
                created_at,
                respond_to,
            } => {
                let result =
                    self.insert_backup_record(&id, &kind, &status, &description, created_at);
                let _ = respond_to.send(result);
            }
            DbMessage::CompleteBackupRecord {
                id,
                size_bytes,
                replication_warnings,
                finished_at,
                respond_to,
            } => {
                let result = self.complete_backup_record(
                    &id,
                    size_bytes,
                    &replication_warnings,
                    finished_at,
                );
                let _ = respond_to.send(result);
            }
            DbMessage::FailBackupRecord {
                id,
                error_text,
                replication_warnings,
                finished_at,
                respond_to,
            } => {
                let result =
                    self.fail_backup_record(&id, &error_text, &replication_warnings, finished_at);
                let _ = respond_to.send(result);
            }
            DbMessage::GetRecentBackups { limit, respond_to } => {
                let result = self.get_recent_backups(limit);
                let _ = respond_to.send(result);
            }
            DbMessage::GetBackupById { id, respond_to } => {
                let result = self.get_backup_by_id(&id);
                let _ = respond_to.send(result);
            }
        }
    }

    /// 初始化数据库表
    fn init_tables(&mut self) -> Result<()> {
        debug!("正在初始化备份历史表...");

        // 读取并执行SQL初始化脚本
        let sql_content = include_str!("../../migrations/init_duckdb.sql");

        // 按分号分割SQL语句并执行
        for statement in sql_content.split(';').filter(|s| !s.trim().is_empty()) {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                self.connection.execute(trimmed, [])?;
            }
        }

        info!("备份历史表初始化完成");
        Ok(())
    }

    /// 插入进行中的备份记录
    fn insert_backup_record(
        &mut self,
        id: &str,
        kind: &str,
        status: &str,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.connection.execute(
            "INSERT INTO backup_history (id, kind, status, description, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![id, kind, status, description, created_at],
        )?;
        Ok(())
    }

    /// 备份成功的终态转移
    ///
    /// WHERE 条件保证记录只能从 in_progress 转移一次。
    fn complete_backup_record(
        &mut self,
        id: &str,
        size_bytes: i64,
        replication_warnings: &str,
        finished_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self.connection.execute(
            "UPDATE backup_history
             SET status = 'completed', size_bytes = ?, replication_warnings = ?, finished_at = ?
             WHERE id = ? AND status = 'in_progress'",
            params![size_bytes, replication_warnings, finished_at, id],
        )?;

        if updated == 0 {
            return Err(MagpieError::DuckDb(format!(
                "备份记录 {id} 不存在或已处于终态"
            )));
        }
        Ok(())
    }

    /// 备份失败的终态转移
    fn fail_backup_record(
        &mut self,
        id: &str,
        error_text: &str,
        replication_warnings: &str,
        finished_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = self.connection.execute(
            "UPDATE backup_history
             SET status = 'failed', error_text = ?, replication_warnings = ?, finished_at = ?
             WHERE id = ? AND status = 'in_progress'",
            params![error_text, replication_warnings, finished_at, id],
        )?;

        if updated == 0 {
            return Err(MagpieError::DuckDb(format!(
                "备份记录 {id} 不存在或已处于终态"
            )));
        }
        Ok(())
    }

    /// 获取最近的备份记录，时间倒序
    fn get_recent_backups(&mut self, limit: usize) -> Result<Vec<BackupRecordRow>> {
        let mut stmt = self.connection.prepare(
            "SELECT id, kind, status, description, size_bytes, error_text,
                    replication_warnings, created_at, finished_at
             FROM backup_history ORDER BY created_at DESC, id DESC LIMIT ?",
        )?;

        let record_iter = stmt.query_map(params![limit as i64], Self::row_to_record)?;

        let mut records = Vec::new();
        for record in record_iter {
            records.push(record?);
        }

        Ok(records)
    }

    /// 根据ID获取备份记录
    fn get_backup_by_id(&mut self, id: &str) -> Result<Option<BackupRecordRow>> {
        let mut stmt = self.connection.prepare(
            "SELECT id, kind, status, description, size_bytes, error_text,
                    replication_warnings, created_at, finished_at
             FROM backup_history WHERE id = ?",
        )?;

        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_record(row)?))
        } else {
            Ok(None)
        }
    }

    /// 行到记录的映射
    fn row_to_record(row: &Row<'_>) -> std::result::Result<BackupRecordRow, duckdb::Error> {
        Ok(BackupRecordRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            status: row.get(2)?,
            description: row.get(3)?,
            size_bytes: row.get(4)?,
            error_text: row.get(5)?,
            replication_warnings: row.get(6)?,
            created_at: row.get(7)?,
            finished_at: row.get(8)?,
        })
    }
}
