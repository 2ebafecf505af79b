use crate::config::{
    BackupConfiguration, ConfigManager, ConfigPatch, GoogleDriveConfig, JsonFileStore,
};
use crate::constants;
use crate::database::{BackupKind, BackupRecord, Database};
use crate::error::{MagpieError, Result};
use crate::manifest::{self, BackupManifest};
use crate::replicate::{DriveReplicator, GitReplicator, ProbeResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// 备份来源布局
///
/// 管理面板各数据分类在磁盘上的位置。默认取工作目录布局，
/// 部署与测试可以整体覆盖。
#[derive(Debug, Clone)]
pub struct BackupSources {
    /// 主数据库文件
    pub database_file: PathBuf,
    /// 管理端文件白名单（目录与顶层配置文件的混合列表）
    pub admin_paths: Vec<PathBuf>,
    /// 服务端源码目录
    pub server_dir: PathBuf,
    /// 日志目录
    pub logs_dir: PathBuf,
}

impl Default for BackupSources {
    fn default() -> Self {
        Self {
            database_file: constants::sources::get_database_file(),
            admin_paths: constants::sources::ADMIN_FILES
                .iter()
                .map(PathBuf::from)
                .collect(),
            server_dir: PathBuf::from(constants::sources::SERVER_DIR),
            logs_dir: PathBuf::from(constants::sources::LOGS_DIR),
        }
    }
}

/// 打包归档信息
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInfo {
    pub id: String,
    pub archive_path: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// 备份引擎
///
/// 负责快照生成、清单写入、历史记录、打包下载与远程同步分发。
/// 同一时间只允许一次备份运行。
pub struct BackupEngine {
    backup_root: PathBuf,
    sources: BackupSources,
    config: Arc<ConfigManager>,
    database: Database,
    git: GitReplicator,
    drive: DriveReplicator,
    // 运行互斥：重入的 create_backup 立即拒绝
    run_lock: Mutex<()>,
}

impl BackupEngine {
    /// 创建备份引擎，必要时建立备份根目录
    pub fn new(
        backup_root: PathBuf,
        sources: BackupSources,
        config: Arc<ConfigManager>,
        database: Database,
        git: GitReplicator,
        drive: DriveReplicator,
    ) -> Result<Self> {
        if !backup_root.exists() {
            std::fs::create_dir_all(&backup_root)?;
        }

        Ok(Self {
            backup_root,
            sources,
            config,
            database,
            git,
            drive,
            run_lock: Mutex::new(()),
        })
    }

    /// 按默认依赖构建引擎：JSON 配置文件 + 备份根目录下的历史库 + 系统 git
    pub async fn bootstrap(
        backup_root: PathBuf,
        sources: BackupSources,
        config_path: PathBuf,
    ) -> Result<Arc<Self>> {
        let config = Arc::new(ConfigManager::load(Box::new(JsonFileStore::new(
            config_path,
        )))?);
        let database =
            Database::connect(backup_root.join(constants::storage::HISTORY_DB_NAME)).await?;
        let engine = BackupEngine::new(
            backup_root,
            sources,
            config,
            database,
            GitReplicator::system(),
            DriveReplicator::new()?,
        )?;
        Ok(Arc::new(engine))
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// 快照目录集合
    pub fn snapshots_dir(&self) -> PathBuf {
        self.backup_root
            .join(constants::storage::SNAPSHOT_DIR_NAME)
    }

    /// 打包归档目录
    pub fn archives_dir(&self) -> PathBuf {
        self.backup_root.join(constants::storage::ARCHIVE_DIR_NAME)
    }

    /// 当前配置快照
    pub async fn configuration(&self) -> BackupConfiguration {
        self.config.current().await
    }

    /// 浅合并更新配置并立即持久化
    pub async fn update_configuration(&self, patch: ConfigPatch) -> Result<BackupConfiguration> {
        self.config.update(patch).await
    }

    /// 创建一次备份
    ///
    /// 分类按固定顺序复制进时间戳命名的快照目录，随后写清单、
    /// 算总大小。复制失败使本次运行 failed；远程同步失败只记为
    /// 警告，主结果保持 completed。无论成败都返回最终记录。
    pub async fn create_backup(&self) -> Result<BackupRecord> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| MagpieError::BackupInProgress)?;

        let config = self.config.current().await;
        let created_at = Utc::now();
        let id = self.unique_run_id(created_at).await?;
        let kind = resolve_kind(&config);
        let description = describe_run(&config);

        info!("开始创建备份: {id}");
        self.database
            .begin_run(&id, kind, &description, created_at)
            .await?;

        let snapshot_dir = self.snapshots_dir().join(&id);
        match self.build_snapshot(&config, &id, &snapshot_dir).await {
            Ok(total_bytes) => {
                let warnings = self
                    .replicate_snapshot(&config, &snapshot_dir, &id)
                    .await;
                self.database
                    .finish_run_completed(&id, total_bytes, &warnings)
                    .await?;
                info!("备份完成: {id}（{total_bytes} 字节）");
            }
            Err(e) => {
                // 已复制的部分留在磁盘上供排查，不做回滚
                error!("备份失败: {e}");
                self.database
                    .finish_run_failed(&id, &e.to_string(), &[])
                    .await?;
            }
        }

        self.database
            .find_backup(&id)
            .await?
            .ok_or_else(|| MagpieError::backup("无法读取刚创建的备份记录"))
    }

    /// 生成唯一的运行标识
    ///
    /// 标识取自创建时间（秒级），同一秒内的再次运行追加序号，
    /// 历史表主键与快照目录名都不会冲突。运行互斥锁此时已持有，
    /// 检查与插入之间没有并发运行穿插。
    async fn unique_run_id(&self, created_at: DateTime<Utc>) -> Result<String> {
        let base = format!(
            "{}{}",
            constants::storage::SNAPSHOT_PREFIX,
            created_at.format(constants::storage::SNAPSHOT_TIMESTAMP_FORMAT)
        );
        let mut id = base.clone();
        let mut serial = 2;
        while self.find_backup(&id).await?.is_some() {
            id = format!("{base}_{serial}");
            serial += 1;
        }
        Ok(id)
    }

    /// 复制启用的分类并写入清单，返回快照总大小
    async fn build_snapshot(
        &self,
        config: &BackupConfiguration,
        id: &str,
        snapshot_dir: &Path,
    ) -> Result<u64> {
        tokio::fs::create_dir_all(snapshot_dir).await?;

        // 固定复制顺序：database → adminFiles → serverFiles → logs
        if config.backup_types.database {
            self.copy_database(snapshot_dir).await?;
        }
        if config.backup_types.admin_files {
            self.copy_admin_files(snapshot_dir).await?;
        }
        if config.backup_types.server_files {
            copy_tree(
                &self.sources.server_dir,
                &snapshot_dir.join(constants::category::SERVER),
            )
            .await?;
        }
        if config.backup_types.logs {
            copy_tree(
                &self.sources.logs_dir,
                &snapshot_dir.join(constants::category::LOGS),
            )
            .await?;
        }

        // 全部复制完成后扫描一次，文件列表与总大小同时得出
        let scan = manifest::scan_snapshot(snapshot_dir)?;
        let total_bytes = scan.total_bytes;
        BackupManifest::new(id, scan.files).write_to(snapshot_dir)?;
        Ok(total_bytes)
    }

    /// 复制主数据库文件；文件缺失时跳过该分类
    async fn copy_database(&self, snapshot_dir: &Path) -> Result<()> {
        let source = &self.sources.database_file;
        if !source.is_file() {
            warn!("数据库文件不存在，跳过: {}", source.display());
            return Ok(());
        }

        let target_dir = snapshot_dir.join(constants::category::DATABASE);
        tokio::fs::create_dir_all(&target_dir).await?;
        let file_name = source.file_name().ok_or_else(|| {
            MagpieError::backup(format!("数据库文件路径无效: {}", source.display()))
        })?;
        tokio::fs::copy(source, target_dir.join(file_name))
            .await
            .map_err(|e| MagpieError::backup(format!("复制数据库文件失败: {e}")))?;
        Ok(())
    }

    /// 按白名单复制管理端文件；缺失的条目跳过
    async fn copy_admin_files(&self, snapshot_dir: &Path) -> Result<()> {
        let target_root = snapshot_dir.join(constants::category::ADMIN);
        for source in &self.sources.admin_paths {
            if !source.exists() {
                debug!("管理端路径不存在，跳过: {}", source.display());
                continue;
            }
            let name = source.file_name().ok_or_else(|| {
                MagpieError::backup(format!("管理端路径无效: {}", source.display()))
            })?;
            let target = target_root.join(name);
            if source.is_dir() {
                copy_tree(source, &target).await?;
            } else {
                tokio::fs::create_dir_all(&target_root).await?;
                tokio::fs::copy(source, &target)
                    .await
                    .map_err(|e| {
                        MagpieError::backup(format!(
                            "复制 {} 失败: {e}",
                            source.display()
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// 尽力而为的远程同步；失败转化为警告，不中断运行
    async fn replicate_snapshot(
        &self,
        config: &BackupConfiguration,
        snapshot_dir: &Path,
        id: &str,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if config.github.enabled {
            let snapshot_rel = snapshot_dir
                .strip_prefix(&self.backup_root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| snapshot_dir.to_path_buf());
            if let Err(e) = self
                .git
                .replicate(&config.github, &self.backup_root, &snapshot_rel, id)
                .await
            {
                warn!("git 同步失败: {e}");
                warnings.push(format!("git 同步失败: {e}"));
            }
        }

        if config.google_drive.enabled {
            match self.replicate_to_drive(&config.google_drive, id).await {
                Ok(file_id) => debug!("云盘文件ID: {file_id}"),
                Err(e) => {
                    warn!("云盘同步失败: {e}");
                    warnings.push(format!("云盘同步失败: {e}"));
                }
            }
        }

        warnings
    }

    /// 云盘上传复用下载用的打包产物
    async fn replicate_to_drive(&self, cfg: &GoogleDriveConfig, id: &str) -> Result<String> {
        let archive = self.package_snapshot(id).await?;
        self.drive
            .replicate(cfg, Path::new(&archive.archive_path))
            .await
    }

    /// 将已有快照打包为单个压缩归档
    ///
    /// 快照不存在时返回 NotFound，且不产生任何文件系统写入。
    pub async fn download_backup(&self, id: &str) -> Result<ArchiveInfo> {
        // 标识来自外部输入：必须带快照前缀，拒绝路径穿越与裸目录引用
        if !id.starts_with(constants::storage::SNAPSHOT_PREFIX)
            || id.contains('/')
            || id.contains('\\')
            || id.contains("..")
        {
            return Err(MagpieError::not_found(format!("快照 {id} 不存在")));
        }
        let snapshot_dir = self.snapshots_dir().join(id);
        if !snapshot_dir.is_dir() {
            return Err(MagpieError::not_found(format!("快照 {id} 不存在")));
        }
        self.package_snapshot(id).await
    }

    /// 最近的备份记录，时间倒序
    pub async fn list_history(&self, limit: usize) -> Result<Vec<BackupRecord>> {
        self.database.recent_backups(limit).await
    }

    /// 根据ID查找备份记录
    pub async fn find_backup(&self, id: &str) -> Result<Option<BackupRecord>> {
        self.database.find_backup(id).await
    }

    /// github 连通性检查
    pub async fn test_git_connection(&self) -> ProbeResult {
        let config = self.config.current().await;
        self.git.probe(&config.github, &self.backup_root).await
    }

    /// Google Drive 连通性检查
    pub async fn test_drive_connection(&self) -> ProbeResult {
        let config = self.config.current().await;
        self.drive.probe(&config.google_drive).await
    }

    /// 打包快照为 tar.gz，重复调用复用既有归档
    async fn package_snapshot(&self, id: &str) -> Result<ArchiveInfo> {
        let snapshot_dir = self.snapshots_dir().join(id);
        let archives_dir = self.archives_dir();
        tokio::fs::create_dir_all(&archives_dir).await?;
        let archive_path =
            archives_dir.join(format!("{id}{}", constants::storage::ARCHIVE_EXTENSION));

        if !archive_path.is_file() {
            self.perform_package(&snapshot_dir, &archive_path, id).await?;
        }

        let metadata = tokio::fs::metadata(&archive_path).await?;
        let sha256 = file_sha256(&archive_path).await?;
        info!(
            "归档就绪: {}（sha256 前缀: {}）",
            archive_path.display(),
            &sha256[..12]
        );

        Ok(ArchiveInfo {
            id: id.to_string(),
            archive_path: archive_path.to_string_lossy().to_string(),
            size_bytes: metadata.len(),
            sha256,
        })
    }

    /// 执行实际的打包操作
    async fn perform_package(
        &self,
        snapshot_dir: &Path,
        archive_path: &Path,
        id: &str,
    ) -> Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::fs::File;
        use tar::Builder;

        let snapshot_dir = snapshot_dir.to_path_buf();
        let archive_path = archive_path.to_path_buf();
        let id = id.to_string();

        // 在后台线程中执行压缩操作，避免阻塞异步运行时
        tokio::task::spawn_blocking(move || {
            let file = File::create(&archive_path)?;
            let encoder = GzEncoder::new(file, Compression::default());
            let mut archive = Builder::new(encoder);

            for entry in WalkDir::new(&snapshot_dir) {
                let entry =
                    entry.map_err(|e| MagpieError::backup(format!("遍历快照失败: {e}")))?;
                let path = entry.path();

                if path.is_file() {
                    let relative_path = path
                        .strip_prefix(&snapshot_dir)
                        .map_err(|e| MagpieError::backup(format!("计算相对路径失败: {e}")))?;

                    // tar归档内部使用Unix风格路径（/），跨平台兼容
                    let archive_entry = format!(
                        "{}/{}",
                        id,
                        relative_path.display().to_string().replace('\\', "/")
                    );

                    archive
                        .append_path_with_name(path, archive_entry)
                        .map_err(|e| {
                            MagpieError::backup(format!("添加文件到归档失败: {e}"))
                        })?;
                }
            }

            archive
                .finish()
                .map_err(|e| MagpieError::backup(format!("完成归档失败: {e}")))?;

            Ok::<(), MagpieError>(())
        })
        .await??;

        Ok(())
    }

    /// 校验归档可读并返回条目数量
    pub async fn verify_archive(&self, archive_path: &Path) -> Result<usize> {
        use flate2::read::GzDecoder;
        use tar::Archive;

        let archive_path = archive_path.to_path_buf();
        let count = tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&archive_path)?;
            let mut archive = Archive::new(GzDecoder::new(file));
            let mut count = 0usize;
            for entry in archive
                .entries()
                .map_err(|e| MagpieError::backup(format!("读取归档失败: {e}")))?
            {
                entry.map_err(|e| MagpieError::backup(format!("归档条目损坏: {e}")))?;
                count += 1;
            }
            Ok::<usize, MagpieError>(count)
        })
        .await??;

        Ok(count)
    }
}

/// 本次运行的主要同步目标：git 优先于云盘，两者都未启用则为本地
fn resolve_kind(config: &BackupConfiguration) -> BackupKind {
    if config.github.enabled {
        BackupKind::Git
    } else if config.google_drive.enabled {
        BackupKind::Drive
    } else {
        BackupKind::Local
    }
}

/// 人类可读的运行描述，列出启用的分类
fn describe_run(config: &BackupConfiguration) -> String {
    let types = &config.backup_types;
    let mut parts = Vec::new();
    if types.database {
        parts.push("database");
    }
    if types.admin_files {
        parts.push("adminFiles");
    }
    if types.server_files {
        parts.push("serverFiles");
    }
    if types.logs {
        parts.push("logs");
    }

    if parts.is_empty() {
        "备份（未启用任何分类）".to_string()
    } else {
        format!("备份（{}）", parts.join(", "))
    }
}

/// 递归复制目录树，保持相对结构；来源缺失时跳过
async fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    if !source.exists() {
        debug!("来源目录不存在，跳过: {}", source.display());
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| MagpieError::backup(format!("遍历目录失败: {e}")))?;
        let relative = entry.path().strip_prefix(source)?;
        let target_path = target.join(relative);

        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target_path).await?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(entry.path(), &target_path).await.map_err(|e| {
                MagpieError::backup(format!("复制 {} 失败: {e}", entry.path().display()))
            })?;
        }
    }
    Ok(())
}

/// 计算文件的 sha256（十六进制）
async fn file_sha256(path: &Path) -> Result<String> {
    let path = path.to_path_buf();
    let digest = tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&path)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        Ok::<_, MagpieError>(hasher.finalize())
    })
    .await??;
    Ok(format!("{digest:x}"))
}
