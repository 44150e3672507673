//! Periodic background refetch.

use crate::engine::{OptimisticEngine, RefreshOutcome};
use std::time::Duration;
use taskdeck_core::ServerShape;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Refetches an engine's collection on a fixed interval.
///
/// Ticks that land while a mutation is in flight are skipped by the engine
/// (`RefreshOutcome::Deferred`); the next tick tries again. Failed fetches are
/// logged and never surface as notifications.
pub struct RefreshScheduler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawns the refresh loop. The first refetch happens one `period` after
    /// start.
    pub fn start<E: ServerShape>(engine: OptimisticEngine<E>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            tracing::info!(target: "refresh", kind = %E::KIND, "Scheduler started ({:?} interval)", period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match engine.refresh().await {
                    Ok(RefreshOutcome::Applied { count }) => {
                        tracing::debug!(target: "refresh", kind = %E::KIND, count, "Tick applied");
                    }
                    Ok(RefreshOutcome::Deferred) => {
                        tracing::debug!(target: "refresh", kind = %E::KIND, "Tick skipped, mutations pending");
                    }
                    Err(e) => {
                        tracing::warn!(target: "refresh", kind = %E::KIND, "Refetch failed: {}", e);
                    }
                }
            }

            tracing::info!(target: "refresh", kind = %E::KIND, "Scheduler stopped");
        });

        Self { cancel, task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the loop and waits for it to exit. A refetch already in
    /// progress runs to completion first.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(target: "refresh", "Scheduler task failed: {}", e);
        }
    }
}
