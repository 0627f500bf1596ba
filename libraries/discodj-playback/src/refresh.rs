//! Periodic progress refresh
//!
//! While a track plays, its room's panel is re-rendered on a fixed interval
//! so the progress bar moves. The loop is owned by the room and is always
//! stopped explicitly on pause, stop, idle and leave.

use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Spawn a loop calling `tick` every `period`
///
/// The first call happens one full period after spawning. The loop ends
/// when `tick` resolves to `false` or the returned handle is aborted.
pub fn spawn_refresh_loop<F, Fut>(period: Duration, mut tick: F) -> AbortHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let period = period.max(Duration::from_millis(10));
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval fires immediately once
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !tick().await {
                break;
            }
        }
    });
    task.abort_handle()
}

/// Abort a running loop, if any
pub fn stop_refresh_loop(handle: &mut Option<AbortHandle>) {
    if let Some(handle) = handle.take() {
        handle.abort();
    }
}
