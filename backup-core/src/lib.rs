pub mod config;
pub mod constants;
pub mod database;
pub mod db;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod replicate;
pub mod scheduler;

pub use config::{BackupConfiguration, ConfigManager, ConfigPatch};
pub use database::{BackupKind, BackupRecord, BackupState, Database};
pub use engine::{ArchiveInfo, BackupEngine, BackupSources};
pub use error::{MagpieError, Result};
pub use replicate::ProbeResult;
pub use scheduler::BackupScheduler;
