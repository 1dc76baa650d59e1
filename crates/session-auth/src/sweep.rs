//! Background sweep of expired sessions
//!
//! Validation already deletes expired sessions it runs into; the sweep catches
//! the ones nobody presents again so the store does not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::manager::OAuthSessionManager;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Handle to a running sweep task.
pub struct SweepHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep and wait for the task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            debug!(error = %e, "session sweep task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn a task that calls `sweep_expired()` every `interval` until stopped.
///
/// The first sweep runs one full interval after spawn.
pub fn spawn_sweeper(manager: Arc<OAuthSessionManager>, interval: Duration) -> SweepHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            manager.sweep_expired().await;
        }
        info!("session sweep stopped");
    });

    SweepHandle { cancel, task }
}
