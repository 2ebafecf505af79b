use crate::app::CliApp;
use crate::utils::format_size;
use backup_core::{BackupState, Result};
use tracing::{info, warn};

/// 显示版本、配置摘要与最近一次备份
pub async fn run_status(app: &CliApp) -> Result<()> {
    info!("🐦 Magpie 备份引擎");
    info!("==================");
    info!("   版本: {}", env!("CARGO_PKG_VERSION"));
    info!("   备份根目录: {}", app.engine.backup_root().display());

    let config = app.engine.configuration().await;
    info!("📋 配置摘要:");
    info!("   github 同步: {}", on_off(config.github.enabled));
    info!("   云盘同步: {}", on_off(config.google_drive.enabled));
    if config.schedule.enabled {
        info!(
            "   定时备份: 每天 {} (时区: {})",
            config.schedule.time, config.schedule.timezone
        );
    } else {
        info!("   定时备份: 未启用");
    }

    match app.engine.list_history(1).await?.into_iter().next() {
        Some(last) => {
            info!("🕒 最近一次备份:");
            info!("   ID: {}", last.id);
            info!("   时间: {}", last.created_at.format("%Y-%m-%d %H:%M:%S"));
            match last.state {
                BackupState::Completed => {
                    info!("   状态: ✅ 完成");
                    if let Some(size) = last.size_bytes {
                        info!("   大小: {}", format_size(size));
                    }
                    for warning in &last.replication_warnings {
                        warn!("   ⚠️  {warning}");
                    }
                }
                BackupState::Failed => {
                    warn!("   状态: ❌ 失败");
                    if let Some(error_text) = &last.error_text {
                        warn!("   错误: {error_text}");
                    }
                }
                BackupState::InProgress => info!("   状态: ⏳ 进行中"),
                BackupState::Pending => info!("   状态: ⏸  等待中"),
            }
        }
        None => {
            info!("🕒 暂无备份记录");
            info!("💡 运行 magpie-cli backup run 创建第一个备份");
        }
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "✅ 已启用" } else { "⏹️ 未启用" }
}
