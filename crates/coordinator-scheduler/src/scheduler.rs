use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use coordinator_core::error::CoordinatorError;
use coordinator_core::receipt::SettlementResult;
use coordinator_core::types::EpochId;
use coordinator_settlement::{EpochClock, SettlementEngine};

/// Application-facing handle returned from [`EpochScheduler::new`]. Dropping
/// it does not stop the scheduler; call [`SchedulerHandle::shutdown`].
pub struct SchedulerHandle {
    /// Fires with the result of every settlement attempt, successful or not.
    pub results_rx: mpsc::Receiver<Result<SettlementResult, CoordinatorError>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SchedulerHandle {
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Drives epoch settlement on a fixed tick. Ticks at `poll_interval` and, on
/// each tick, settles every epoch from the last settled one up to (but not
/// including) the current wall-clock epoch — so a node that was offline for
/// several epochs catches up instead of skipping them. `settle_epoch` is
/// already idempotent, so a crash mid-catch-up just replays harmlessly.
pub struct EpochScheduler {
    engine: Arc<SettlementEngine>,
    clock: EpochClock,
    poll_interval: Duration,
    last_settled: Option<EpochId>,
    results_tx: mpsc::Sender<Result<SettlementResult, CoordinatorError>>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl EpochScheduler {
    pub fn new(
        engine: Arc<SettlementEngine>,
        clock: EpochClock,
        poll_interval: Duration,
        last_settled: Option<EpochId>,
    ) -> (Self, SchedulerHandle) {
        let (results_tx, results_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        (
            Self {
                engine,
                clock,
                poll_interval,
                last_settled,
                results_tx,
                shutdown_rx,
            },
            SchedulerHandle {
                results_rx,
                shutdown_tx: Some(shutdown_tx),
            },
        )
    }

    /// Runs until `shutdown()` is called on the paired handle. Pass to
    /// `tokio::spawn(scheduler.run())`.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = &mut self.shutdown_rx => {
                    info!("epoch scheduler shutting down");
                    break;
                }
            }
        }
    }

    async fn tick(&mut self) {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let current = self.clock.current_epoch(now_ms);
        // Only settle epochs that have fully elapsed.
        if current == 0 {
            return;
        }
        let start = self.last_settled.map(|e| e + 1).unwrap_or(0);
        for epoch in start..current {
            let engine = Arc::clone(&self.engine);
            let result = tokio::task::spawn_blocking(move || engine.settle_epoch(epoch))
                .await
                .unwrap_or_else(|e| Err(CoordinatorError::Other(e.to_string())));
            match &result {
                Ok(r) if !r.already_settled => {
                    info!(epoch, rows = r.rows.len(), "scheduler settled epoch");
                }
                Ok(_) => {}
                Err(e) => error!(epoch, error = %e, "epoch settlement failed"),
            }
            if result.is_ok() {
                self.last_settled = Some(epoch);
            }
            if self.results_tx.send(result).await.is_err() {
                // Handle dropped; keep settling so state stays consistent,
                // but no one is listening for results anymore.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordinator_settlement::EpochClock;

    #[test]
    fn tick_range_excludes_current_epoch() {
        // Epoch 3 has not fully elapsed yet; settling up through epoch 2
        // only is exercised indirectly via `tick()` in integration tests
        // that spin up a StateDb. This unit test just pins the boundary
        // semantics of `current_epoch` that `tick()` relies on.
        let clock = EpochClock::new(0);
        let epoch_len = coordinator_core::constants::EPOCH_LENGTH_MS;
        assert_eq!(clock.current_epoch(epoch_len * 3), 3);
        assert_eq!(clock.current_epoch(epoch_len * 3 - 1), 2);
    }
}
