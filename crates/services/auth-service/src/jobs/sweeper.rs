//! Background removal of expired refresh sessions.
//!
//! Expired sessions are already unusable; refresh rejects them on lookup.
//! The sweep only keeps the table from growing with sessions nobody will
//! ever present again.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::repository::SessionRepository;
use common::AppResult;

/// Delete every session expired as of now. Returns how many were removed.
pub async fn sweep_once(sessions: &dyn SessionRepository, clock: &dyn Clock) -> AppResult<u64> {
    let removed = sessions.delete_expired(clock.now()).await?;

    if removed > 0 {
        tracing::info!(removed, "Swept expired refresh sessions");
    } else {
        tracing::debug!("No expired refresh sessions");
    }

    Ok(removed)
}

/// Sweep every `interval` until the task is dropped.
///
/// Failures are logged and the loop carries on with the next tick.
pub async fn run_sweep_loop(
    sessions: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if let Err(e) = sweep_once(sessions.as_ref(), clock.as_ref()).await {
            tracing::error!(error = %e, code = e.code(), "Session sweep failed");
        }
    }
}
