mod handlers;
mod routes;
mod state;

use backup_core::{BackupEngine, BackupScheduler, BackupSources, MagpieError};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Magpie 备份引擎 HTTP 服务
#[derive(Parser)]
#[command(name = "magpie-server")]
#[command(about = "管理面板备份引擎 HTTP 服务：REST API + 后台定时调度")]
#[command(version)]
struct Args {
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// 监听端口
    #[arg(long, default_value = "3100")]
    port: u16,

    /// 配置文件路径
    #[arg(short, long, default_value = "backup-config.json")]
    config: PathBuf,

    /// 备份根目录
    #[arg(long, default_value = "backup-data")]
    root: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> backup_core::Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);

    info!("🐦 Magpie 备份服务启动中...");
    let engine =
        BackupEngine::bootstrap(args.root, BackupSources::default(), args.config).await?;

    // 后台调度器与 HTTP 服务共享同一个引擎
    let scheduler = BackupScheduler::start(engine.clone());

    let app = routes::create_router(engine);

    let host = args
        .host
        .parse()
        .map_err(|e| MagpieError::custom(format!("无效的监听地址 {}: {e}", args.host)))?;
    let addr = SocketAddr::new(host, args.port);
    info!("🚀 服务监听于 http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP 服务退出后再停掉调度器，进行中的备份不被打断
    scheduler.shutdown().await;
    info!("👋 服务已退出");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    info!("收到退出信号，正在关闭服务...");
}

/// 服务端日志：保留时间戳与目标字段，便于对照请求日志
fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(env_filter).init();
}
