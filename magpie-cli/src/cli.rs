use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 备份管理相关命令
#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    /// 立即执行一次备份
    Run,
    /// 列出备份历史
    List {
        /// 显示的记录数量
        #[arg(long, default_value = "50", help = "显示的记录数量")]
        limit: usize,
    },
    /// 将指定快照打包为 tar.gz 归档
    Download {
        /// 备份ID，例如 backup_2025-06-01_02-00-00
        id: String,
    },
}

/// 配置管理相关命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置（凭证脱敏）
    Show,
}

/// 定时备份相关命令
#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// 启用定时备份
    On,
    /// 禁用定时备份
    Off,
    /// 显示定时备份状态
    Status,
    /// 在前台运行调度循环，Ctrl+C 退出
    Run,
}

/// 远程同步连通性测试命令
#[derive(Subcommand, Debug)]
pub enum TestCommand {
    /// 测试 github 仓库同步配置
    Github,
    /// 测试 Google Drive 同步配置
    Drive,
}

/// Magpie CLI - 管理面板备份引擎
#[derive(Parser)]
#[command(name = "magpie-cli")]
#[command(about = "管理面板备份引擎：快照、历史、远程同步与定时调度")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "backup-config.json")]
    pub config: PathBuf,

    /// 备份根目录
    #[arg(long, default_value = "backup-data")]
    pub root: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 首次使用时初始化：创建配置文件、备份目录和历史数据库
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 显示版本、配置摘要与最近一次备份
    Status,
    /// 备份管理
    #[command(subcommand)]
    Backup(BackupCommand),
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
    /// 定时备份管理
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// 远程同步连通性测试
    #[command(subcommand)]
    Test(TestCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backup_run() {
        let cli = Cli::try_parse_from(["magpie-cli", "backup", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Backup(BackupCommand::Run)));
        assert_eq!(cli.config, PathBuf::from("backup-config.json"));
        assert_eq!(cli.root, PathBuf::from("backup-data"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_list_with_limit() {
        let cli =
            Cli::try_parse_from(["magpie-cli", "backup", "list", "--limit", "5"]).unwrap();
        match cli.command {
            Commands::Backup(BackupCommand::List { limit }) => assert_eq!(limit, 5),
            _ => panic!("解析结果不是 backup list"),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "magpie-cli",
            "--config",
            "/etc/magpie/backup.json",
            "--root",
            "/var/magpie",
            "-v",
            "status",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/magpie/backup.json"));
        assert_eq!(cli.root, PathBuf::from("/var/magpie"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn test_download_requires_id() {
        assert!(Cli::try_parse_from(["magpie-cli", "backup", "download"]).is_err());
    }
}
