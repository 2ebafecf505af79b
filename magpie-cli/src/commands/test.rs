use crate::app::CliApp;
use backup_core::Result;
use tracing::{error, info};

/// 测试 github 仓库同步配置
pub async fn run_test_github(app: &CliApp) -> Result<()> {
    info!("🔍 测试 github 仓库同步配置...");

    let result = app.engine.test_git_connection().await;
    if result.success {
        info!("✅ {}", result.message);
    } else {
        error!("❌ {}", result.message);
        info!("💡 请检查配置文件中的 github 配置段");
    }
    Ok(())
}

/// 测试 Google Drive 同步配置
pub async fn run_test_drive(app: &CliApp) -> Result<()> {
    info!("🔍 测试 Google Drive 同步配置...");

    let result = app.engine.test_drive_connection().await;
    if result.success {
        info!("✅ {}", result.message);
    } else {
        error!("❌ {}", result.message);
        info!("💡 请检查配置文件中的 googleDrive 配置段");
    }
    Ok(())
}
