//! Background poll loop driving [`TriggerEngine::check_and_trigger_due`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prayerbot_core::error::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::{SweepReport, TriggerEngine, TriggerResult};

/// Spawn the poll loop on the current runtime.
/// Send `true` on the shutdown channel to stop it after the current sweep.
pub fn spawn_poll_loop(
    engine: Arc<TriggerEngine>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<()>> {
    tokio::spawn(run_poll_loop(engine, interval, shutdown))
}

/// Check for due groups every `interval` until shut down.
///
/// Gateway failures never stop the loop. A store failure does: the error is
/// returned so the process can exit instead of running on a broken database.
pub async fn run_poll_loop(
    engine: Arc<TriggerEngine>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    tracing::info!("⏰ Poller started (check every {}s)", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match engine.check_and_trigger_due(Utc::now()).await {
                    Ok(Some(report)) => log_sweep(&report),
                    Ok(None) => tracing::debug!("Previous sweep still running, skipping tick"),
                    Err(e) => {
                        tracing::error!("❌ Poller stopped: {e}");
                        return Err(e);
                    }
                }
            }
        }
    }

    tracing::info!("⏰ Poller stopped");
    Ok(())
}

fn log_sweep(report: &SweepReport) {
    let fired = report
        .results
        .iter()
        .filter(|(_, r)| matches!(r, TriggerResult::Triggered(_)))
        .count();
    if fired > 0 {
        tracing::info!("📣 Sweep: {fired} of {} groups triggered", report.checked);
    } else {
        tracing::trace!("Sweep: nothing due among {} groups", report.checked);
    }
}
