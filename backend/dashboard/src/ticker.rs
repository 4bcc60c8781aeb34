//! Long-running background task that re-evaluates the countdown against the
//! wall clock. It only reads the cached snapshot; it never touches the
//! network.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::{unix_now, Dashboard};

/// Tick every `period` until `shutdown` is cancelled.
pub async fn run(dashboard: Arc<Dashboard>, period: Duration, shutdown: CancellationToken) {
    info!("Countdown ticking every {}ms", period.as_millis());

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Countdown stopped");
                break;
            }
            _ = interval.tick() => {
                if let Some((from, to)) = dashboard.tick(unix_now()).await {
                    info!("Campaign phase changed: {from:?} -> {to:?}");
                }
            }
        }
    }
}
