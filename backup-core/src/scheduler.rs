use crate::config::{ScheduleConfig, ScheduleTimezone};
use crate::constants;
use crate::engine::BackupEngine;
use crate::error::{MagpieError, Result};
use chrono::{DateTime, Local, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 定时备份调度器
///
/// 每分钟轮询一次：重读配置、在配置时区下取当前时分，命中
/// HH:MM 即触发一次备份。分钟戳保证同一分钟内只触发一次；
/// 配置热更新最迟在下一轮轮询生效。
pub struct BackupScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl BackupScheduler {
    /// 启动调度循环
    pub fn start(engine: Arc<BackupEngine>) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            run_loop(engine, task_cancel).await;
        });
        info!("定时备份调度器已启动");
        Self { cancel, handle }
    }

    /// 停止调度循环并等待任务退出
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("调度任务退出异常: {e}");
        }
        info!("定时备份调度器已停止");
    }
}

async fn run_loop(engine: Arc<BackupEngine>, cancel: CancellationToken) {
    let mut ticker = interval(Duration::from_secs(
        constants::schedule::POLL_INTERVAL_SECS,
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_fired: Option<String> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("调度循环收到取消信号");
                break;
            }
            _ = ticker.tick() => {}
        }

        // 每轮重读配置，调度开关与触发时间的修改即时生效
        let schedule = engine.configuration().await.schedule;
        match due_stamp(&schedule, Utc::now(), last_fired.as_deref()) {
            Ok(Some(stamp)) => {
                last_fired = Some(stamp);
                info!("到达计划时间 {}，触发定时备份", schedule.time);
                match engine.create_backup().await {
                    Ok(record) => {
                        info!("定时备份完成: {}（{}）", record.id, record.state.as_str())
                    }
                    Err(MagpieError::BackupInProgress) => {
                        warn!("已有备份任务在执行中，本次定时触发跳过")
                    }
                    Err(e) => error!("定时备份失败: {e}"),
                }
            }
            Ok(None) => {}
            Err(e) => warn!("调度配置无效，本轮跳过: {e}"),
        }
    }
}

/// 判断当前时刻是否到达触发点，返回应记录的分钟戳
///
/// 返回 `Some` 表示触发，调用方须把返回值存为 last_fired，
/// 同一分钟内的后续轮询据此去重。
fn due_stamp(
    schedule: &ScheduleConfig,
    now_utc: DateTime<Utc>,
    last_fired: Option<&str>,
) -> Result<Option<String>> {
    if !schedule.enabled {
        return Ok(None);
    }

    let (hour, minute) = schedule.parse_time()?;
    let timezone = schedule.parse_timezone()?;
    let (now_hour, now_minute, stamp) = clock_in(&timezone, now_utc);

    if now_hour != hour || now_minute != minute {
        return Ok(None);
    }
    if last_fired == Some(stamp.as_str()) {
        return Ok(None);
    }
    Ok(Some(stamp))
}

/// 配置时区下的当前时、分与分钟戳
fn clock_in(timezone: &ScheduleTimezone, now_utc: DateTime<Utc>) -> (u32, u32, String) {
    match timezone {
        ScheduleTimezone::Local => minute_parts(now_utc.with_timezone(&Local)),
        ScheduleTimezone::Utc => minute_parts(now_utc),
        ScheduleTimezone::Fixed(offset) => minute_parts(now_utc.with_timezone(offset)),
    }
}

fn minute_parts<Tz: chrono::TimeZone>(now: DateTime<Tz>) -> (u32, u32, String)
where
    Tz::Offset: std::fmt::Display,
{
    (
        now.hour(),
        now.minute(),
        now.format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackupConfiguration, ConfigManager, MemoryStore};
    use crate::database::Database;
    use crate::engine::BackupSources;
    use crate::replicate::{DriveReplicator, GitReplicator, git::fake::RecordingGitClient};
    use chrono::TimeZone;

    fn enabled_at(time: &str, timezone: &str) -> ScheduleConfig {
        ScheduleConfig {
            enabled: true,
            time: time.to_string(),
            timezone: timezone.to_string(),
        }
    }

    #[test]
    fn test_fires_exactly_once_per_minute() {
        let schedule = enabled_at("12:00", "utc");
        let mut last: Option<String> = None;

        // 11:59 不触发
        let before = Utc.with_ymd_and_hms(2025, 6, 1, 11, 59, 30).unwrap();
        assert!(due_stamp(&schedule, before, last.as_deref())
            .unwrap()
            .is_none());

        // 12:00 第一次轮询触发
        let hit = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 5).unwrap();
        let stamp = due_stamp(&schedule, hit, last.as_deref()).unwrap();
        assert!(stamp.is_some());
        last = stamp;

        // 同一分钟的第二次轮询去重
        let same_minute = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 45).unwrap();
        assert!(due_stamp(&schedule, same_minute, last.as_deref())
            .unwrap()
            .is_none());

        // 12:01 已过触发点
        let after = Utc.with_ymd_and_hms(2025, 6, 1, 12, 1, 10).unwrap();
        assert!(due_stamp(&schedule, after, last.as_deref())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_fires_again_next_day() {
        let schedule = enabled_at("12:00", "utc");
        let first = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let stamp = due_stamp(&schedule, first, None).unwrap();
        assert!(stamp.is_some());

        let next_day = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        assert!(due_stamp(&schedule, next_day, stamp.as_deref())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut schedule = enabled_at("12:00", "utc");
        schedule.enabled = false;
        let hit = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(due_stamp(&schedule, hit, None).unwrap().is_none());
    }

    #[test]
    fn test_fixed_offset_timezone() {
        // +08:00 的 20:00 等于 UTC 12:00
        let schedule = enabled_at("20:00", "+08:00");
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(due_stamp(&schedule, now, None).unwrap().is_some());

        let off = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();
        assert!(due_stamp(&schedule, off, None).unwrap().is_none());
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let schedule = enabled_at("25:00", "utc");
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(due_stamp(&schedule, now, None).is_err());

        let schedule = enabled_at("12:00", "Mars/Olympus");
        assert!(due_stamp(&schedule, now, None).is_err());
    }

    #[tokio::test]
    async fn test_scheduler_starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::load(Box::new(MemoryStore::with_config(
                BackupConfiguration::default(),
            )))
            .unwrap();
        let database = Database::connect_memory().await.unwrap();
        let engine = BackupEngine::new(
            dir.path().join("backup-root"),
            BackupSources {
                database_file: dir.path().join("missing.db"),
                admin_paths: vec![],
                server_dir: dir.path().join("missing-server"),
                logs_dir: dir.path().join("missing-logs"),
            },
            Arc::new(manager),
            database,
            GitReplicator::new(Arc::new(RecordingGitClient::new())),
            DriveReplicator::new().unwrap(),
        )
        .unwrap();
        let engine = Arc::new(engine);

        let scheduler = BackupScheduler::start(engine.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // 取消后任务应当立即退出
        tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
            .await
            .unwrap();

        // 调度未启用，期间不应产生任何备份
        assert!(engine.list_history(10).await.unwrap().is_empty());
    }
}
