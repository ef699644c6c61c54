//! Background schedule for recurring runs.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{Runner, TriggerSource};
use crate::config::Schedule;

/// Spawn a background task that triggers runs on `schedule`.
///
/// With an interval the first run starts immediately and each following run
/// starts one interval after the previous one finished. With a cron
/// expression every run waits for the next fire time.
///
/// Returns a `JoinHandle` and a shutdown signal. `notify_one` on the signal
/// wakes a pending wait at once; a run already in progress is finished first
/// and the task exits before the next one.
pub fn spawn_scheduler(runner: Arc<Runner>, schedule: Schedule) -> (JoinHandle<()>, Arc<Notify>) {
    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!("Scheduler started: {}", schedule.describe());

        let mut wait_first = matches!(schedule, Schedule::Cron(_));
        loop {
            if wait_first {
                let Some(delay) = schedule.next_delay() else {
                    warn!("Schedule has no upcoming fire time, scheduler stopping");
                    return;
                };
                tokio::select! {
                    biased;
                    _ = shutdown.notified() => {
                        info!("Scheduler shutting down");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            wait_first = true;

            // Outcome is already logged by the runner.
            runner.trigger(TriggerSource::Schedule).await;
        }
    });

    (handle, shutdown_signal)
}
