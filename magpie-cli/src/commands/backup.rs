use crate::app::CliApp;
use crate::utils::format_size;
use backup_core::{BackupState, Result};
use tracing::{error, info, warn};

/// 创建备份
pub async fn run_backup(app: &CliApp) -> Result<()> {
    info!("💾 创建数据备份");
    info!("===============");

    let config = app.engine.configuration().await;
    let types = &config.backup_types;
    info!("   备份分类:");
    info!("     {} database     (主数据库文件)", check_mark(types.database));
    info!("     {} adminFiles   (管理端文件)", check_mark(types.admin_files));
    info!("     {} serverFiles  (服务端源码)", check_mark(types.server_files));
    info!("     {} logs         (运行日志)", check_mark(types.logs));
    info!("   备份目录: {}", app.engine.backup_root().display());

    let record = app.engine.create_backup().await?;

    match record.state {
        BackupState::Completed => {
            info!("🎉 备份创建成功！");
            info!("   备份ID: {}", record.id);
            info!(
                "   备份时间: {}",
                record.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(size) = record.size_bytes {
                info!("   数据大小: {}", format_size(size));
            }

            for warning in &record.replication_warnings {
                warn!("   ⚠️  {warning}");
            }
            if !record.replication_warnings.is_empty() {
                info!("💡 远程同步未全部成功，可用连通性测试排查:");
                info!("   magpie-cli test github");
                info!("   magpie-cli test drive");
            }
        }
        _ => {
            error!(
                "❌ 备份创建失败: {}",
                record.error_text.as_deref().unwrap_or("未知错误")
            );
            info!("💡 请检查:");
            info!("   - 备份目录是否有写入权限");
            info!("   - 磁盘空间是否充足");
            info!("   - 数据目录是否可读");
        }
    }

    Ok(())
}

/// 列出备份历史
pub async fn run_list_backups(app: &CliApp, limit: usize) -> Result<()> {
    let backups = app.engine.list_history(limit).await?;

    if backups.is_empty() {
        info!("📦 暂无备份记录");
        info!("💡 使用以下命令创建备份:");
        info!("   magpie-cli backup run");
        return Ok(());
    }

    info!("📦 备份历史");
    info!("============");
    info!(
        "{:<28} {:<6} {:<10} {:<20} {:<10} {}",
        "ID", "类型", "状态", "创建时间", "大小", "说明"
    );
    info!("{}", "-".repeat(100));

    let mut completed = 0;
    let mut failed = 0;
    let mut total_size = 0u64;

    for record in &backups {
        match record.state {
            BackupState::Completed => completed += 1,
            BackupState::Failed => failed += 1,
            _ => {}
        }

        let size_display = match record.size_bytes {
            Some(size) => {
                total_size += size;
                format_size(size)
            }
            None => "---".to_string(),
        };

        let state_display = match record.state {
            BackupState::Completed => "✅ 完成",
            BackupState::Failed => "❌ 失败",
            BackupState::InProgress => "⏳ 进行中",
            BackupState::Pending => "⏸  等待中",
        };

        info!(
            "{:<28} {:<6} {:<10} {:<20} {:<10} {}",
            record.id,
            record.kind.as_str(),
            state_display,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            size_display,
            record.description,
        );

        for warning in &record.replication_warnings {
            warn!("     ⚠️  {warning}");
        }
        if let Some(error_text) = &record.error_text {
            warn!("     ❌ {error_text}");
        }
    }

    info!("{}", "-".repeat(100));

    // 统计摘要
    info!("📊 备份统计:");
    info!("   总记录数: {}", backups.len());
    info!("   成功: {completed} ✅");
    if failed > 0 {
        warn!("   失败: {failed} ❌");
    }
    if total_size > 0 {
        info!("   总大小: {}", format_size(total_size));
    }

    Ok(())
}

/// 将指定快照打包为 tar.gz 归档
pub async fn run_download(app: &CliApp, id: &str) -> Result<()> {
    info!("📦 打包快照: {id}");

    let archive = app.engine.download_backup(id).await?;
    let entries = app
        .engine
        .verify_archive(std::path::Path::new(&archive.archive_path))
        .await?;

    info!("🎉 归档已生成！");
    info!("   文件路径: {}", archive.archive_path);
    info!("   文件大小: {}", format_size(archive.size_bytes));
    info!("   包含条目: {entries}");
    info!("   SHA-256: {}", archive.sha256);
    Ok(())
}

fn check_mark(enabled: bool) -> &'static str {
    if enabled { "✅" } else { "⬜" }
}
