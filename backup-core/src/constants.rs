/// 备份存储相关常量
pub mod storage {
    use std::path::{Path, PathBuf};

    /// 备份根目录名
    pub const BACKUP_ROOT_DIR_NAME: &str = "backup-data";

    /// 快照目录集合名
    pub const SNAPSHOT_DIR_NAME: &str = "backups";

    /// 打包归档目录名
    pub const ARCHIVE_DIR_NAME: &str = "archives";

    /// 快照目录前缀
    pub const SNAPSHOT_PREFIX: &str = "backup_";

    /// 快照目录时间戳格式
    pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

    /// 打包归档扩展名
    pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

    /// 历史记录数据库文件名
    pub const HISTORY_DB_NAME: &str = "backup_history.db";

    /// 获取默认备份根目录路径（跨平台）
    pub fn get_backup_root() -> PathBuf {
        Path::new(".").join(BACKUP_ROOT_DIR_NAME)
    }
}

/// 备份来源相关常量
///
/// 管理面板的默认目录布局：数据库文件、管理端源码、服务端源码和日志目录
/// 都位于工作目录下。实际路径可在构造引擎时覆盖。
pub mod sources {
    use std::path::{Path, PathBuf};

    /// 主数据库文件相对路径
    pub const DATABASE_FILE: &str = "data/panel.db";

    /// 管理端文件白名单（目录与顶层配置文件的混合列表）
    pub const ADMIN_FILES: &[&str] = &["admin/src", "admin/public", "admin/package.json"];

    /// 服务端源码目录
    pub const SERVER_DIR: &str = "server";

    /// 日志目录
    pub const LOGS_DIR: &str = "logs";

    /// 获取默认数据库文件路径
    pub fn get_database_file() -> PathBuf {
        Path::new(".").join(DATABASE_FILE)
    }
}

/// 快照分类相关常量
pub mod category {
    /// 数据库分类在快照中的子目录名
    pub const DATABASE: &str = "database";

    /// 管理端文件分类子目录名
    pub const ADMIN: &str = "admin";

    /// 服务端文件分类子目录名
    pub const SERVER: &str = "server";

    /// 日志分类子目录名
    pub const LOGS: &str = "logs";
}

/// 清单文件相关常量
pub mod manifest {
    /// 清单文件名
    pub const FILE_NAME: &str = "manifest.json";

    /// 清单格式版本
    pub const SCHEMA_VERSION: &str = "1.0";
}

/// 定时调度相关常量
pub mod schedule {
    /// 调度器轮询间隔（秒）
    pub const POLL_INTERVAL_SECS: u64 = 60;

    /// 默认触发时间
    pub const DEFAULT_TIME: &str = "02:00";

    /// 默认时区
    pub const DEFAULT_TIMEZONE: &str = "local";
}

/// 远程同步相关常量
pub mod replication {
    /// 单次 git 命令 / 云盘请求超时（秒）
    pub const TIMEOUT_SECS: u64 = 30;

    /// 临时备份分支前缀
    pub const BRANCH_PREFIX: &str = "backup/";

    /// 默认提交作者名
    pub const DEFAULT_AUTHOR_NAME: &str = "magpie-backup";

    /// 默认提交作者邮箱
    pub const DEFAULT_AUTHOR_EMAIL: &str = "backup@localhost";

    /// Google OAuth 令牌端点
    pub const DRIVE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Google Drive 文件上传端点
    pub const DRIVE_UPLOAD_URL: &str =
        "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";
}

/// 配置文件相关常量
pub mod config {
    use std::path::{Path, PathBuf};

    /// 默认配置文件名
    pub const DEFAULT_FILE_NAME: &str = "backup-config.json";

    /// 获取默认配置文件路径（跨平台）
    pub fn get_default_config_path() -> PathBuf {
        Path::new(".").join(DEFAULT_FILE_NAME)
    }
}

/// API服务相关常量
pub mod api {
    /// 默认API服务器主机
    pub const DEFAULT_HOST: &str = "127.0.0.1";

    /// 默认API服务器端口
    pub const DEFAULT_PORT: u16 = 3100;

    /// 历史记录查询默认条数
    pub const DEFAULT_HISTORY_LIMIT: usize = 50;
}

/// 日志相关常量
pub mod logging {
    /// 日志重定向文件环境变量
    pub const LOG_FILE_ENV: &str = "MAGPIE_LOG_FILE";
}
