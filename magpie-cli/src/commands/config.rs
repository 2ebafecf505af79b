use crate::app::CliApp;
use backup_core::Result;
use tracing::info;

/// 显示当前配置，凭证字段脱敏
pub async fn run_config_show(app: &CliApp) -> Result<()> {
    let config = app.engine.configuration().await;

    info!("📋 当前配置");
    info!("============");
    info!("github:");
    info!("   enabled: {}", config.github.enabled);
    info!("   repository: {}", display_or_unset(&config.github.repository));
    info!("   branch: {}", display_or_unset(&config.github.branch));
    info!("   token: {}", mask(&config.github.token));
    info!("   username: {}", display_or_unset(&config.github.username));
    info!("   email: {}", display_or_unset(&config.github.email));
    info!("googleDrive:");
    info!("   enabled: {}", config.google_drive.enabled);
    info!("   clientId: {}", mask(&config.google_drive.client_id));
    info!("   clientSecret: {}", mask(&config.google_drive.client_secret));
    info!("   refreshToken: {}", mask(&config.google_drive.refresh_token));
    info!("   folderId: {}", display_or_unset(&config.google_drive.folder_id));
    info!("schedule:");
    info!("   enabled: {}", config.schedule.enabled);
    info!("   time: {}", config.schedule.time);
    info!("   timezone: {}", config.schedule.timezone);
    info!("backupTypes:");
    info!("   database: {}", config.backup_types.database);
    info!("   adminFiles: {}", config.backup_types.admin_files);
    info!("   serverFiles: {}", config.backup_types.server_files);
    info!("   logs: {}", config.backup_types.logs);

    Ok(())
}

/// 凭证脱敏：只显示前4个字符
fn mask(value: &str) -> String {
    if value.is_empty() {
        "(未设置)".to_string()
    } else if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        let head: String = value.chars().take(4).collect();
        format!("{head}****")
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.trim().is_empty() { "(未设置)" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_credentials() {
        assert_eq!(mask(""), "(未设置)");
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask("ghp_secrettoken"), "ghp_****");
    }

    #[test]
    fn test_display_or_unset() {
        assert_eq!(display_or_unset(""), "(未设置)");
        assert_eq!(display_or_unset("  "), "(未设置)");
        assert_eq!(display_or_unset("main"), "main");
    }
}
