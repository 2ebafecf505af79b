use crate::db::{BackupRecordRow, MagpieDbManager};
use crate::error::{MagpieError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// 备份历史门面 - DuckDB适配器
///
/// 在字符串形态的行模型之上提供类型化的记录接口。
#[derive(Debug, Clone)]
pub struct Database {
    manager: MagpieDbManager,
}

/// 备份记录
///
/// 序列化键名与管理面板约定一致（camelCase，状态字段名为 state）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: String,
    pub kind: BackupKind,
    pub state: BackupState,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub size_bytes: Option<u64>,
    pub error_text: Option<String>,
    /// 远程同步失败的警告，与主错误字段分开记录
    pub replication_warnings: Vec<String>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// 备份去向：一次运行的主要同步目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Git,
    Drive,
    Local,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Git => "git",
            BackupKind::Drive => "drive",
            BackupKind::Local => "local",
        }
    }
}

impl FromStr for BackupKind {
    type Err = MagpieError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(BackupKind::Git),
            "drive" => Ok(BackupKind::Drive),
            "local" => Ok(BackupKind::Local),
            other => Err(MagpieError::custom(format!("未知的备份去向: {other}"))),
        }
    }
}

/// 备份状态
///
/// 记录以 in_progress 插入，恰好一次转移到 completed 或 failed。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BackupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupState::Pending => "pending",
            BackupState::InProgress => "in_progress",
            BackupState::Completed => "completed",
            BackupState::Failed => "failed",
        }
    }
}

impl FromStr for BackupState {
    type Err = MagpieError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(BackupState::Pending),
            "in_progress" => Ok(BackupState::InProgress),
            "completed" => Ok(BackupState::Completed),
            "failed" => Ok(BackupState::Failed),
            other => Err(MagpieError::custom(format!("未知的备份状态: {other}"))),
        }
    }
}

impl TryFrom<BackupRecordRow> for BackupRecord {
    type Error = MagpieError;

    fn try_from(row: BackupRecordRow) -> Result<Self> {
        let warnings: Vec<String> = serde_json::from_str(&row.replication_warnings)?;
        Ok(BackupRecord {
            id: row.id,
            kind: row.kind.parse()?,
            state: row.status.parse()?,
            created_at: row.created_at,
            description: row.description,
            size_bytes: row.size_bytes.map(|v| v.max(0) as u64),
            error_text: row.error_text,
            replication_warnings: warnings,
            finished_at: row.finished_at,
        })
    }
}

impl Database {
    /// 连接到数据库
    pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let manager = MagpieDbManager::new(db_path).await?;
        Ok(Database { manager })
    }

    /// 连接到内存数据库 (主要用于测试，生产环境建议使用connect()以确保数据持久化)
    pub async fn connect_memory() -> Result<Self> {
        let manager = MagpieDbManager::new_memory().await?;
        Ok(Database { manager })
    }

    /// 备份运行开始，插入进行中的记录
    pub async fn begin_run(
        &self,
        id: &str,
        kind: BackupKind,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.manager
            .insert_backup_record(
                id.to_string(),
                kind.as_str().to_string(),
                BackupState::InProgress.as_str().to_string(),
                description.to_string(),
                created_at,
            )
            .await
    }

    /// 备份成功，写入终态与总大小
    pub async fn finish_run_completed(
        &self,
        id: &str,
        size_bytes: u64,
        replication_warnings: &[String],
    ) -> Result<()> {
        let warnings = serde_json::to_string(replication_warnings)?;
        self.manager
            .complete_backup_record(id.to_string(), size_bytes as i64, warnings, Utc::now())
            .await
    }

    /// 备份失败，写入终态与错误文本
    pub async fn finish_run_failed(
        &self,
        id: &str,
        error_text: &str,
        replication_warnings: &[String],
    ) -> Result<()> {
        let warnings = serde_json::to_string(replication_warnings)?;
        self.manager
            .fail_backup_record(id.to_string(), error_text.to_string(), warnings, Utc::now())
            .await
    }

    /// 最近的备份记录，时间倒序
    pub async fn recent_backups(&self, limit: usize) -> Result<Vec<BackupRecord>> {
        let rows = self.manager.get_recent_backups(limit).await?;
        rows.into_iter().map(BackupRecord::try_from).collect()
    }

    /// 根据ID查找备份记录
    pub async fn find_backup(&self, id: &str) -> Result<Option<BackupRecord>> {
        match self.manager.get_backup_by_id(id.to_string()).await? {
            Some(row) => Ok(Some(BackupRecord::try_from(row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_and_state_mapping() {
        assert_eq!(BackupKind::Git.as_str(), "git");
        assert_eq!("local".parse::<BackupKind>().unwrap(), BackupKind::Local);
        assert!("tape".parse::<BackupKind>().is_err());

        assert_eq!(BackupState::InProgress.as_str(), "in_progress");
        assert_eq!(
            "completed".parse::<BackupState>().unwrap(),
            BackupState::Completed
        );
        assert!("done".parse::<BackupState>().is_err());
    }

    #[test]
    fn test_record_wire_keys() {
        let record = BackupRecord {
            id: "backup_2025-01-01_02-00-00".to_string(),
            kind: BackupKind::Local,
            state: BackupState::Completed,
            created_at: Utc::now(),
            description: "数据库备份".to_string(),
            size_bytes: Some(120),
            error_text: None,
            replication_warnings: vec![],
            finished_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"state\":\"completed\""));
        assert!(json.contains("\"kind\":\"local\""));
        assert!(json.contains("\"sizeBytes\":120"));
        assert!(json.contains("\"replicationWarnings\""));
        assert!(json.contains("\"createdAt\""));
    }

    #[tokio::test]
    async fn test_completed_run_roundtrip() {
        let db = Database::connect_memory().await.unwrap();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap();

        db.begin_run("backup_2025-01-01_02-00-00", BackupKind::Local, "数据库备份", created)
            .await
            .unwrap();
        db.finish_run_completed(
            "backup_2025-01-01_02-00-00",
            120,
            &["git 推送失败: 网络不可达".to_string()],
        )
        .await
        .unwrap();

        let record = db
            .find_backup("backup_2025-01-01_02-00-00")
            .await
            .unwrap()
            .expect("记录应存在");
        assert_eq!(record.state, BackupState::Completed);
        assert_eq!(record.size_bytes, Some(120));
        assert_eq!(record.replication_warnings.len(), 1);
        assert!(record.error_text.is_none());
        assert!(record.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_run_records_error_text() {
        let db = Database::connect_memory().await.unwrap();

        db.begin_run("backup_2025-01-02_02-00-00", BackupKind::Git, "全量备份", Utc::now())
            .await
            .unwrap();
        db.finish_run_failed("backup_2025-01-02_02-00-00", "复制数据库文件失败", &[])
            .await
            .unwrap();

        let record = db
            .find_backup("backup_2025-01-02_02-00-00")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.state, BackupState::Failed);
        assert_eq!(record.error_text.as_deref(), Some("复制数据库文件失败"));
        assert!(record.size_bytes.is_none());
    }

    #[tokio::test]
    async fn test_terminal_state_is_write_once() {
        let db = Database::connect_memory().await.unwrap();

        db.begin_run("backup_2025-01-03_02-00-00", BackupKind::Local, "备份", Utc::now())
            .await
            .unwrap();
        db.finish_run_completed("backup_2025-01-03_02-00-00", 10, &[])
            .await
            .unwrap();

        // 终态只能写入一次
        let second = db
            .finish_run_failed("backup_2025-01-03_02-00-00", "后置错误", &[])
            .await;
        assert!(second.is_err());

        let record = db
            .find_backup("backup_2025-01-03_02-00-00")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.state, BackupState::Completed);
    }

    #[tokio::test]
    async fn test_recent_backups_order_and_limit() {
        let db = Database::connect_memory().await.unwrap();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        for i in 0..3 {
            let id = format!("backup_2025-03-01_00-0{i}-00");
            db.begin_run(&id, BackupKind::Local, "备份", base + chrono::Duration::minutes(i))
                .await
                .unwrap();
        }

        let records = db.recent_backups(2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "backup_2025-03-01_00-02-00");
        assert_eq!(records[1].id, "backup_2025-03-01_00-01-00");
    }

    #[tokio::test]
    async fn test_find_missing_backup() {
        let db = Database::connect_memory().await.unwrap();
        assert!(db.find_backup("backup_1999-01-01_00-00-00").await.unwrap().is_none());
    }
}
