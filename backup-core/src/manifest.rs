use crate::constants;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

/// 快照清单，每次备份写入快照根目录
///
/// 线上格式固定：{ id, timestamp, version, system, files }，
/// 管理面板直接读取该文件展示备份内容。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// 备份运行标识，与历史记录、快照目录名一致
    pub id: String,
    /// 备份完成时间（ISO 8601）
    pub timestamp: DateTime<Utc>,
    /// 清单格式版本
    pub version: String,
    /// 产生该备份的主机信息
    pub system: SystemInfo,
    /// 快照内全部文件的相对路径，字典序排列，不含清单自身
    pub files: Vec<String>,
}

/// 主机信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub runtime_version: String,
    pub arch: String,
}

impl SystemInfo {
    pub fn current() -> Self {
        Self {
            platform: std::env::consts::OS.to_string(),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl BackupManifest {
    pub fn new(id: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            version: constants::manifest::SCHEMA_VERSION.to_string(),
            system: SystemInfo::current(),
            files,
        }
    }

    /// 写入快照根目录下的 manifest.json
    pub fn write_to(&self, snapshot_dir: &Path) -> Result<()> {
        let path = snapshot_dir.join(constants::manifest::FILE_NAME);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 从快照根目录读取清单
    pub fn load_from(snapshot_dir: &Path) -> Result<Self> {
        let path = snapshot_dir.join(constants::manifest::FILE_NAME);
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// 快照目录扫描结果
#[derive(Debug)]
pub struct SnapshotScan {
    /// 相对路径列表，字典序
    pub files: Vec<String>,
    /// 文件总大小（字节）
    pub total_bytes: u64,
}

/// 递归扫描快照目录，产出有序文件列表与总大小
///
/// 清单文件自身不计入列表与大小；所有复制完成后调用，
/// 因此结果即为该次备份的完整内容。
pub fn scan_snapshot(snapshot_dir: &Path) -> Result<SnapshotScan> {
    let mut files = Vec::new();
    let mut total_bytes = 0u64;

    for entry in WalkDir::new(snapshot_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(snapshot_dir)?;
        // 统一使用Unix风格路径分隔符
        let relative = relative.to_string_lossy().replace('\\', "/");
        if relative == constants::manifest::FILE_NAME {
            continue;
        }
        total_bytes += entry.metadata()?.len();
        files.push(relative);
    }

    files.sort();
    Ok(SnapshotScan { files, total_bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_snapshot_sorted_and_sized() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("database/panel.db"), b"0123456789");
        write_file(&root.join("admin/src/index.ts"), b"abc");
        write_file(&root.join("logs/app.log"), b"xyz!");

        let scan = scan_snapshot(root).unwrap();

        assert_eq!(
            scan.files,
            vec![
                "admin/src/index.ts".to_string(),
                "database/panel.db".to_string(),
                "logs/app.log".to_string(),
            ]
        );
        assert_eq!(scan.total_bytes, 10 + 3 + 4);
    }

    #[test]
    fn test_scan_skips_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("database/panel.db"), b"data");

        let manifest = BackupManifest::new("backup_2025-01-01_02-00-00", vec![]);
        manifest.write_to(root).unwrap();

        let scan = scan_snapshot(root).unwrap();
        assert_eq!(scan.files, vec!["database/panel.db".to_string()]);
        assert_eq!(scan.total_bytes, 4);
    }

    #[test]
    fn test_manifest_roundtrip_and_wire_keys() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = BackupManifest::new(
            "backup_2025-01-01_02-00-00",
            vec!["database/panel.db".to_string()],
        );
        manifest.write_to(dir.path()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        assert!(raw.contains("\"runtimeVersion\""));
        assert!(raw.contains("\"timestamp\""));

        let loaded = BackupManifest::load_from(dir.path()).unwrap();
        assert_eq!(loaded.id, manifest.id);
        assert_eq!(loaded.files, manifest.files);
        assert_eq!(loaded.version, constants::manifest::SCHEMA_VERSION);
    }
}
