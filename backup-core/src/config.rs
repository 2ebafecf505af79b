use crate::constants;
use crate::error::{MagpieError, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 备份系统配置（进程内单例，JSON 持久化）
///
/// 字段名与管理面板约定的线上格式保持一致（camelCase），
/// 配置文件可以只包含部分顶层键，缺失部分回落到默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupConfiguration {
    /// GitHub 远程同步配置
    pub github: GithubConfig,
    /// Google Drive 远程同步配置
    pub google_drive: GoogleDriveConfig,
    /// 定时备份配置
    pub schedule: ScheduleConfig,
    /// 备份分类开关
    pub backup_types: BackupTypes,
}

/// GitHub 远程同步配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubConfig {
    pub enabled: bool,
    /// 远程仓库地址（https）
    pub repository: String,
    /// 推送目标分支
    pub branch: String,
    /// 访问令牌，不做格式校验，连通性测试时才会暴露问题
    pub token: String,
    pub username: String,
    pub email: String,
}

/// Google Drive 远程同步配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleDriveConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// 上传目标文件夹ID
    pub folder_id: String,
}

/// 定时备份配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// 每日触发时间，HH:MM
    pub time: String,
    /// 时区：local、utc 或固定偏移（如 +08:00）
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time: constants::schedule::DEFAULT_TIME.to_string(),
            timezone: constants::schedule::DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// 备份分类开关
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupTypes {
    pub database: bool,
    pub admin_files: bool,
    pub server_files: bool,
    pub logs: bool,
}

impl Default for BackupTypes {
    fn default() -> Self {
        Self {
            database: true,
            admin_files: true,
            server_files: true,
            logs: true,
        }
    }
}

/// 调度时区的解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleTimezone {
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl ScheduleConfig {
    /// 解析 HH:MM 触发时间
    pub fn parse_time(&self) -> Result<(u32, u32)> {
        parse_time_of_day(&self.time)
    }

    /// 解析时区字段
    pub fn parse_timezone(&self) -> Result<ScheduleTimezone> {
        match self.timezone.trim().to_lowercase().as_str() {
            "" | "local" => Ok(ScheduleTimezone::Local),
            "utc" => Ok(ScheduleTimezone::Utc),
            other => FixedOffset::from_str(other)
                .map(ScheduleTimezone::Fixed)
                .map_err(|_| {
                    MagpieError::config(format!("无法识别的时区: {}", self.timezone))
                }),
        }
    }
}

/// 解析 HH:MM 格式的时间
pub fn parse_time_of_day(value: &str) -> Result<(u32, u32)> {
    let mut parts = value.split(':');
    let (hour, minute) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), None) => (h, m),
        _ => {
            return Err(MagpieError::config(format!(
                "触发时间格式应为 HH:MM，实际为: {value}"
            )));
        }
    };
    let hour: u32 = hour
        .parse()
        .map_err(|_| MagpieError::config(format!("触发时间格式应为 HH:MM，实际为: {value}")))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| MagpieError::config(format!("触发时间格式应为 HH:MM，实际为: {value}")))?;
    if hour > 23 || minute > 59 {
        return Err(MagpieError::config(format!(
            "触发时间超出范围: {value}"
        )));
    }
    Ok((hour, minute))
}

/// 配置的部分更新：按顶层键整体替换，不做深层合并
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub github: Option<GithubConfig>,
    pub google_drive: Option<GoogleDriveConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub backup_types: Option<BackupTypes>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.github.is_none()
            && self.google_drive.is_none()
            && self.schedule.is_none()
            && self.backup_types.is_none()
    }
}

impl BackupConfiguration {
    /// 应用部分更新：补丁中出现的顶层键整体替换当前值
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(github) = patch.github {
            self.github = github;
        }
        if let Some(google_drive) = patch.google_drive {
            self.google_drive = google_drive;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(backup_types) = patch.backup_types {
            self.backup_types = backup_types;
        }
    }

    /// 校验配置自身的格式合法性
    ///
    /// 凭证字段不做校验，问题在连通性测试或同步时才会暴露。
    pub fn validate(&self) -> Result<()> {
        self.schedule.parse_time()?;
        self.schedule.parse_timezone()?;
        Ok(())
    }
}

/// 配置持久化端口
///
/// 引擎只通过该端口读写配置，测试时可替换为内存实现。
pub trait ConfigStore: Send + Sync {
    /// 读取持久化的配置，不存在时返回 None
    fn load(&self) -> Result<Option<BackupConfiguration>>;

    /// 持久化完整配置
    fn save(&self, config: &BackupConfiguration) -> Result<()>;
}

/// JSON 文件配置存储
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 使用工作目录下的默认配置文件
    pub fn default_path() -> Self {
        Self::new(constants::config::get_default_config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<BackupConfiguration>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config: BackupConfiguration = serde_json::from_str(&content)
            .map_err(|e| MagpieError::config(format!("配置文件解析失败: {e}")))?;
        Ok(Some(config))
    }

    fn save(&self, config: &BackupConfiguration) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        debug!("配置已写入: {}", self.path.display());
        Ok(())
    }
}

/// 内存配置存储，测试专用
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Option<BackupConfiguration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BackupConfiguration) -> Self {
        Self {
            inner: Mutex::new(Some(config)),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<BackupConfiguration>> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| MagpieError::custom("内存配置存储锁中毒"))?;
        Ok(guard.clone())
    }

    fn save(&self, config: &BackupConfiguration) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| MagpieError::custom("内存配置存储锁中毒"))?;
        *guard = Some(config.clone());
        Ok(())
    }
}

/// 配置管理器：首次使用时从端口加载，更新时立即写穿
///
/// 单管理员场景，写入由内部 RwLock 串行化。
pub struct ConfigManager {
    store: Box<dyn ConfigStore>,
    current: RwLock<BackupConfiguration>,
}

impl ConfigManager {
    /// 从持久化端口加载配置，文件不存在时使用默认值（不落盘）
    pub fn load(store: Box<dyn ConfigStore>) -> Result<Self> {
        let current = match store.load()? {
            Some(config) => config,
            None => {
                info!("未找到持久化配置，使用默认配置");
                BackupConfiguration::default()
            }
        };
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    /// 当前配置的快照
    pub async fn current(&self) -> BackupConfiguration {
        self.current.read().await.clone()
    }

    /// 浅合并更新并写穿到持久化端口
    ///
    /// 空补丁直接返回当前配置，不触发写入；
    /// 持久化失败时内存配置保持不变。
    pub async fn update(&self, patch: ConfigPatch) -> Result<BackupConfiguration> {
        if patch.is_empty() {
            debug!("空配置补丁，跳过写入");
            return Ok(self.current().await);
        }
        let mut guard = self.current.write().await;
        let mut next = guard.clone();
        next.apply(patch);
        next.validate()?;
        self.store.save(&next)?;
        *guard = next.clone();
        info!("备份配置已更新");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_patch() -> ConfigPatch {
        ConfigPatch {
            github: Some(GithubConfig {
                enabled: true,
                repository: "https://github.com/acme/panel-backups.git".to_string(),
                branch: "backups".to_string(),
                token: "ghp_test".to_string(),
                username: "acme-bot".to_string(),
                email: "bot@acme.dev".to_string(),
            }),
            schedule: Some(ScheduleConfig {
                enabled: true,
                time: "12:00".to_string(),
                timezone: "utc".to_string(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_wire_format_keys() {
        // 序列化结果必须使用管理面板约定的 camelCase 键名
        let json = serde_json::to_string(&BackupConfiguration::default()).unwrap();
        assert!(json.contains("\"googleDrive\""));
        assert!(json.contains("\"backupTypes\""));
        assert!(json.contains("\"adminFiles\""));
        assert!(json.contains("\"serverFiles\""));
        assert!(json.contains("\"refreshToken\""));
    }

    #[test]
    fn test_partial_file_loads_with_defaults() {
        let json = r#"{ "schedule": { "enabled": true, "time": "03:30" } }"#;
        let config: BackupConfiguration = serde_json::from_str(json).unwrap();
        assert!(config.schedule.enabled);
        assert_eq!(config.schedule.time, "03:30");
        assert_eq!(config.schedule.timezone, "local");
        // 未出现的顶层键保持默认
        assert!(!config.github.enabled);
        assert!(config.backup_types.database);
    }

    #[test]
    fn test_apply_replaces_sections_wholesale() {
        let mut config = BackupConfiguration::default();
        config.github.username = "someone".to_string();

        config.apply(sample_patch());

        // github 整体替换，旧的 username 不保留
        assert!(config.github.enabled);
        assert_eq!(config.github.username, "acme-bot");
        assert_eq!(config.schedule.time, "12:00");
        // 未出现在补丁中的顶层键不受影响
        assert!(config.backup_types.server_files);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = BackupConfiguration::default();
        once.apply(sample_patch());

        let mut twice = BackupConfiguration::default();
        twice.apply(sample_patch());
        twice.apply(sample_patch());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("02:00").unwrap(), (2, 0));
        assert_eq!(parse_time_of_day("23:59").unwrap(), (23, 59));
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("1200").is_err());
        assert!(parse_time_of_day("ab:cd").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        let mut schedule = ScheduleConfig::default();
        assert_eq!(schedule.parse_timezone().unwrap(), ScheduleTimezone::Local);

        schedule.timezone = "UTC".to_string();
        assert_eq!(schedule.parse_timezone().unwrap(), ScheduleTimezone::Utc);

        schedule.timezone = "+08:00".to_string();
        match schedule.parse_timezone().unwrap() {
            ScheduleTimezone::Fixed(offset) => {
                assert_eq!(offset.local_minus_utc(), 8 * 3600);
            }
            other => panic!("期望固定偏移时区，实际为 {other:?}"),
        }

        schedule.timezone = "Mars/Olympus".to_string();
        assert!(schedule.parse_timezone().is_err());
    }

    #[tokio::test]
    async fn test_manager_write_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup-config.json");
        let manager = ConfigManager::load(Box::new(JsonFileStore::new(&path))).unwrap();

        manager.update(sample_patch()).await.unwrap();

        // 更新后立即落盘，重新加载能看到合并结果
        let reloaded = ConfigManager::load(Box::new(JsonFileStore::new(&path))).unwrap();
        let config = reloaded.current().await;
        assert!(config.github.enabled);
        assert_eq!(config.schedule.time, "12:00");
    }

    #[tokio::test]
    async fn test_manager_empty_patch_skips_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup-config.json");
        let manager = ConfigManager::load(Box::new(JsonFileStore::new(&path))).unwrap();

        manager.update(sample_patch()).await.unwrap();
        assert!(path.exists());

        // 删掉文件后应用空补丁：不写穿，文件不会被重建
        std::fs::remove_file(&path).unwrap();
        let config = manager.update(ConfigPatch::default()).await.unwrap();
        assert!(config.github.enabled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_manager_rejects_invalid_schedule() {
        let manager = ConfigManager::load(Box::new(MemoryStore::new())).unwrap();
        let patch = ConfigPatch {
            schedule: Some(ScheduleConfig {
                enabled: true,
                time: "25:00".to_string(),
                timezone: "local".to_string(),
            }),
            ..Default::default()
        };

        assert!(manager.update(patch).await.is_err());
        // 更新失败时内存配置保持旧值
        assert_eq!(
            manager.current().await.schedule.time,
            constants::schedule::DEFAULT_TIME
        );
    }
}
