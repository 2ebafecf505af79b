use backup_core::config::{BackupConfiguration, ConfigStore, JsonFileStore};
use backup_core::{Database, Result, constants};
use std::path::Path;
use tracing::{info, warn};

/// 运行独立的初始化流程
pub async fn run_init(config_path: &Path, root: &Path, force: bool) -> Result<()> {
    info!("🐦 Magpie 备份引擎初始化");
    info!("========================");

    // 检查是否已经初始化过
    if !force && config_path.exists() {
        warn!("⚠️  检测到已存在的配置文件: {}", config_path.display());
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: magpie-cli init --force");
        return Ok(());
    }

    info!("📋 步骤 1: 创建默认配置文件");
    let store = JsonFileStore::new(config_path.to_path_buf());
    store.save(&BackupConfiguration::default())?;
    info!("   ✅ 创建配置文件: {}", config_path.display());

    info!("📋 步骤 2: 创建备份目录结构");
    std::fs::create_dir_all(root.join(constants::storage::SNAPSHOT_DIR_NAME))?;
    std::fs::create_dir_all(root.join(constants::storage::ARCHIVE_DIR_NAME))?;
    info!("   ✅ 创建目录结构:");
    info!(
        "      - {}/{}/   (快照目录)",
        root.display(),
        constants::storage::SNAPSHOT_DIR_NAME
    );
    info!(
        "      - {}/{}/   (打包归档目录)",
        root.display(),
        constants::storage::ARCHIVE_DIR_NAME
    );

    info!("📋 步骤 3: 初始化历史数据库");
    let db_path = root.join(constants::storage::HISTORY_DB_NAME);
    let _database = Database::connect(&db_path).await?;
    info!("   ✅ 创建DuckDB数据库: {}", db_path.display());

    info!("🎉 初始化完成！");
    info!("💡 下一步:");
    info!("   - 编辑 {} 配置远程同步与定时计划", config_path.display());
    info!("   - 运行 magpie-cli backup run 创建第一个备份");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("backup-config.json");
        let root = dir.path().join("backup-data");

        run_init(&config_path, &root, false).await.unwrap();

        assert!(config_path.is_file());
        assert!(root.join("backups").is_dir());
        assert!(root.join("archives").is_dir());
        assert!(root.join("backup_history.db").is_file());

        // 配置文件是合法的默认配置
        let store = JsonFileStore::new(config_path.clone());
        let loaded = store.load().unwrap();
        assert_eq!(loaded, Some(BackupConfiguration::default()));
    }

    #[tokio::test]
    async fn test_init_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("backup-config.json");
        let root = dir.path().join("backup-data");

        std::fs::write(&config_path, "{\"schedule\":{\"enabled\":true}}").unwrap();
        run_init(&config_path, &root, false).await.unwrap();

        // 未加 --force 时保留现有文件，也不创建目录
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("\"enabled\":true"));
        assert!(!root.exists());
    }
}
