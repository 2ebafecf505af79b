use crate::app::CliApp;
use backup_core::{BackupScheduler, ConfigPatch, Result};
use tracing::{info, warn};

/// 启用或禁用定时备份
pub async fn set_schedule_enabled(app: &CliApp, enabled: bool) -> Result<()> {
    let mut schedule = app.engine.configuration().await.schedule;
    schedule.enabled = enabled;

    let patch = ConfigPatch {
        schedule: Some(schedule),
        ..Default::default()
    };
    let updated = app.engine.update_configuration(patch).await?;

    if enabled {
        info!(
            "✅ 定时备份已启用: 每天 {} (时区: {})",
            updated.schedule.time, updated.schedule.timezone
        );
        info!("💡 定时触发由常驻进程执行:");
        info!("   - magpie-cli schedule run    (前台调度循环)");
        info!("   - magpie-server              (HTTP 服务内置调度)");
    } else {
        info!("⏹️  定时备份已禁用");
    }
    Ok(())
}

/// 显示定时备份状态
pub async fn show_schedule_status(app: &CliApp) -> Result<()> {
    let schedule = app.engine.configuration().await.schedule;

    info!("⏰ 定时备份状态");
    info!("================");
    if schedule.enabled {
        info!("   状态: ✅ 已启用");
        info!("   触发时间: 每天 {}", schedule.time);
        info!("   时区: {}", schedule.timezone);
    } else {
        info!("   状态: ⏹️  未启用");
        info!("💡 使用 magpie-cli schedule on 启用");
    }
    Ok(())
}

/// 在前台运行调度循环，Ctrl+C 退出
pub async fn run_schedule_foreground(app: &CliApp) -> Result<()> {
    let schedule = app.engine.configuration().await.schedule;
    if !schedule.enabled {
        warn!("⚠️  定时备份未启用，调度循环将空转");
        info!("💡 可先运行 magpie-cli schedule on 启用");
    } else {
        info!("⏰ 触发时间: 每天 {} (时区: {})", schedule.time, schedule.timezone);
    }

    info!("🔄 调度循环已启动，每分钟检查一次，Ctrl+C 退出");
    let scheduler = BackupScheduler::start(app.engine.clone());

    tokio::signal::ctrl_c().await?;
    info!("收到退出信号，正在停止调度...");
    scheduler.shutdown().await;
    Ok(())
}
