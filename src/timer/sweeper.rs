//! Expiry sweeper
//!
//! Background task that periodically sweeps the timer store for expired
//! duration timers and timers whose owning session has vanished. A failing
//! sweep is logged and retried on the next tick; the task only exits on
//! shutdown cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::engine::SleepTimerEngine;

/// Spawn the sweep loop. The returned handle completes once `shutdown` is
/// cancelled and any in-flight sweep has finished.
pub fn spawn(
    engine: Arc<SleepTimerEngine>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(engine, interval, shutdown))
}

/// Sweep loop body. One sweep per tick; a tick that fires while a sweep is
/// still running is skipped rather than queued.
pub async fn run(engine: Arc<SleepTimerEngine>, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first interval tick fires immediately; a fresh start has nothing to sweep
    ticker.tick().await;

    info!(interval_secs = interval.as_secs(), "expiry sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = engine.sweep().await {
                    error!(error = %e, "sweep failed, retrying on next tick");
                }
            }
            _ = shutdown.cancelled() => {
                break;
            }
        }
    }

    info!("expiry sweeper stopped");
}
