use super::{FlushScheduler, now_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodically drop expired signatures and schedule a flush when the live
/// set shrank.
pub fn spawn_replay_sweeper(scheduler: Arc<FlushScheduler>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = scheduler.store().purge_expired(now_ms());
            if removed > 0 {
                tracing::debug!(removed, "swept expired replay entries");
                scheduler.schedule_flush();
            }
        }
    })
}
