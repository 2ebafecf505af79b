use backup_core::{BackupEngine, BackupSources, MagpieError, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{BackupCommand, Commands, ConfigCommand, ScheduleCommand, TestCommand};
use crate::commands;

pub struct CliApp {
    pub engine: Arc<BackupEngine>,
}

impl CliApp {
    /// 按命令行参数装配备份引擎
    ///
    /// 除 `init` 外的命令都要求配置文件已经存在。
    pub async fn new(root: PathBuf, config_path: PathBuf) -> Result<Self> {
        if !config_path.is_file() {
            return Err(MagpieError::ConfigNotFound);
        }

        let engine =
            BackupEngine::bootstrap(root, BackupSources::default(), config_path).await?;
        Ok(Self { engine })
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Status => commands::run_status(self).await,
            Commands::Backup(cmd) => self.run_backup_command(cmd).await,
            Commands::Config(cmd) => match cmd {
                ConfigCommand::Show => commands::run_config_show(self).await,
            },
            Commands::Schedule(cmd) => self.run_schedule_command(cmd).await,
            Commands::Test(cmd) => match cmd {
                TestCommand::Github => commands::run_test_github(self).await,
                TestCommand::Drive => commands::run_test_drive(self).await,
            },
        }
    }

    /// 运行备份管理相关命令
    async fn run_backup_command(&self, cmd: BackupCommand) -> Result<()> {
        match cmd {
            BackupCommand::Run => commands::run_backup(self).await,
            BackupCommand::List { limit } => commands::run_list_backups(self, limit).await,
            BackupCommand::Download { id } => commands::run_download(self, &id).await,
        }
    }

    /// 运行定时备份相关命令
    async fn run_schedule_command(&self, cmd: ScheduleCommand) -> Result<()> {
        match cmd {
            ScheduleCommand::On => commands::set_schedule_enabled(self, true).await,
            ScheduleCommand::Off => commands::set_schedule_enabled(self, false).await,
            ScheduleCommand::Status => commands::show_schedule_status(self).await,
            ScheduleCommand::Run => commands::run_schedule_foreground(self).await,
        }
    }
}
