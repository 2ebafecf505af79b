use thiserror::Error;

pub type Result<T> = std::result::Result<T, MagpieError>;

#[derive(Error, Debug)]
pub enum MagpieError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("配置文件未找到")]
    ConfigNotFound,

    #[error("DuckDB数据库错误: {0}")]
    DuckDb(String),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("备份操作失败: {0}")]
    Backup(String),

    #[error("已有备份任务在执行中")]
    BackupInProgress,

    #[error("Git 同步失败: {0}")]
    Git(String),

    #[error("云盘同步失败: {0}")]
    Drive(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("自定义错误: {0}")]
    Custom(String),
}

// 为DuckDB错误实现From trait
impl From<duckdb::Error> for MagpieError {
    fn from(err: duckdb::Error) -> Self {
        MagpieError::DuckDb(err.to_string())
    }
}

impl MagpieError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    pub fn drive(msg: impl Into<String>) -> Self {
        Self::Drive(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
