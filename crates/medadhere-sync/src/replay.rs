// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replay coordinator.
//!
//! Delivers the pending queue in FIFO order and stops at the first failure.
//! Removal is compare-and-swap against the ids actually delivered, so actions
//! appended while a pass is in flight are never lost.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, error, info, warn};

use medadhere_config::model::{CommitMode, SyncConfig};
use medadhere_core::{ActionId, MedAdhereError, QueueStore, SyncTarget};

/// Where the queue and coordinator pair currently stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// No pass running; the queue may hold pending actions.
    Idle,
    /// A pass is delivering actions.
    Draining,
    /// The last pass emptied the queue and nothing was enqueued since.
    Settled,
}

/// Result of one `replay()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// Nothing was pending; no delivery was attempted.
    Empty,
    /// Every pending action was delivered and removed.
    Delivered {
        count: usize,
        /// Actions enqueued during the pass, still pending.
        remaining: usize,
    },
    /// A delivery failed and the pass stopped there.
    Aborted {
        /// Actions confirmed before the failure.
        delivered: usize,
        /// Actions removed from the queue (zero unless committing confirmed prefixes).
        removed: usize,
        failed: ActionId,
        error: String,
    },
    /// Another pass was already running; this call did nothing.
    AlreadyDraining,
    /// The persisted queue could not be parsed and was moved to quarantine.
    Quarantined { quarantine_id: Option<i64> },
}

impl ReplayOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ReplayOutcome::Empty => "empty",
            ReplayOutcome::Delivered { .. } => "delivered",
            ReplayOutcome::Aborted { .. } => "aborted",
            ReplayOutcome::AlreadyDraining => "already_draining",
            ReplayOutcome::Quarantined { .. } => "quarantined",
        }
    }
}

/// Drains the queue against a sync target, one pass at a time.
pub struct ReplayCoordinator {
    queue: Arc<dyn QueueStore>,
    target: Arc<dyn SyncTarget>,
    commit_mode: CommitMode,
    delivery_timeout: Duration,
    pass: Mutex<()>,
    lane: Mutex<()>,
    state: watch::Sender<ReplayState>,
}

impl ReplayCoordinator {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        target: Arc<dyn SyncTarget>,
        commit_mode: CommitMode,
        delivery_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ReplayState::Idle);
        Self {
            queue,
            target,
            commit_mode,
            delivery_timeout,
            pass: Mutex::new(()),
            lane: Mutex::new(()),
            state,
        }
    }

    /// Build from the `[sync]` config section.
    pub fn from_config(
        queue: Arc<dyn QueueStore>,
        target: Arc<dyn SyncTarget>,
        config: &SyncConfig,
    ) -> Self {
        Self::new(
            queue,
            target,
            config.commit_mode,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn state(&self) -> ReplayState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ReplayState> {
        self.state.subscribe()
    }

    /// Record that an action was enqueued, moving `Settled` back to `Idle`.
    pub fn note_enqueued(&self) {
        self.state.send_if_modified(|state| {
            if *state == ReplayState::Settled {
                *state = ReplayState::Idle;
                true
            } else {
                false
            }
        });
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    /// Exclusive access to the sync target.
    ///
    /// Held for the whole of a replay pass and by the dispatcher for each
    /// direct submit, so deliveries from the two paths never interleave.
    /// Waiters are served in arrival order.
    pub(crate) async fn delivery_lane(&self) -> MutexGuard<'_, ()> {
        self.lane.lock().await
    }

    /// Run one replay pass.
    ///
    /// Delivery failures never surface as errors; they end the pass and are
    /// reported in the outcome. Only storage failures are returned as `Err`.
    pub async fn replay(&self) -> Result<ReplayOutcome, MedAdhereError> {
        let Ok(_pass) = self.pass.try_lock() else {
            debug!("replay requested while a pass is running");
            return Ok(ReplayOutcome::AlreadyDraining);
        };
        let _lane = self.delivery_lane().await;

        let guard = DrainingGuard::enter(&self.state);
        let result = self.run_pass().await;

        let next = match &result {
            Ok(ReplayOutcome::Empty) | Ok(ReplayOutcome::Quarantined { .. }) => {
                ReplayState::Settled
            }
            Ok(ReplayOutcome::Delivered { remaining: 0, .. }) => ReplayState::Settled,
            _ => ReplayState::Idle,
        };
        guard.leave(next);

        match &result {
            Ok(outcome) => {
                medadhere_prometheus::record_replay(outcome.label());
                info!(outcome = outcome.label(), "replay pass finished");
            }
            Err(e) => {
                medadhere_prometheus::record_replay("storage_error");
                error!(error = %e, "replay pass failed on storage");
            }
        }
        result
    }

    async fn run_pass(&self) -> Result<ReplayOutcome, MedAdhereError> {
        let pending = match self.queue.drain().await {
            Ok(pending) => pending,
            Err(MedAdhereError::MalformedPersistedState { key, raw, reason }) => {
                error!(
                    key = %key,
                    reason = %reason,
                    bytes = raw.len(),
                    "persisted queue is malformed, moving it to quarantine"
                );
                let quarantine_id = self.queue.quarantine(&reason).await?;
                medadhere_prometheus::set_queue_depth(0);
                return Ok(ReplayOutcome::Quarantined { quarantine_id });
            }
            Err(e) => return Err(e),
        };

        if pending.is_empty() {
            medadhere_prometheus::set_queue_depth(0);
            return Ok(ReplayOutcome::Empty);
        }
        debug!(pending = pending.len(), "replay pass started");

        let mut delivered: Vec<ActionId> = Vec::with_capacity(pending.len());
        for (position, action) in pending.iter().enumerate() {
            let started = Instant::now();
            let result = tokio::time::timeout(self.delivery_timeout, self.target.deliver(action))
                .await
                .unwrap_or_else(|_| {
                    Err(MedAdhereError::Timeout {
                        duration: self.delivery_timeout,
                    })
                });
            medadhere_prometheus::record_delivery_latency(started.elapsed().as_secs_f64());

            if let Err(e) = result {
                medadhere_prometheus::record_delivery_failure(&e);
                warn!(
                    id = %action.id,
                    kind = %action.kind,
                    position,
                    error = %e,
                    "delivery failed, aborting replay pass"
                );

                let removed = match self.commit_mode {
                    CommitMode::AllOrNothing => 0,
                    CommitMode::ConfirmedPrefix => {
                        self.queue.remove_delivered_prefix(&delivered).await?
                    }
                };
                medadhere_prometheus::set_queue_depth(pending.len() - removed);
                return Ok(ReplayOutcome::Aborted {
                    delivered: delivered.len(),
                    removed,
                    failed: action.id,
                    error: e.to_string(),
                });
            }

            medadhere_prometheus::record_delivered(&action.kind);
            delivered.push(action.id);
        }

        let removed = self.queue.remove_delivered_prefix(&delivered).await?;
        if removed != delivered.len() {
            warn!(
                removed,
                delivered = delivered.len(),
                "queue changed under the replay pass"
            );
        }
        let remaining = self.queue.len().await?;
        medadhere_prometheus::set_queue_depth(remaining);

        Ok(ReplayOutcome::Delivered {
            count: delivered.len(),
            remaining,
        })
    }
}

/// Holds the state at `Draining` for the length of a pass.
///
/// If the pass future is dropped midway the state falls back to `Idle`.
struct DrainingGuard<'a> {
    state: &'a watch::Sender<ReplayState>,
    left: bool,
}

impl<'a> DrainingGuard<'a> {
    fn enter(state: &'a watch::Sender<ReplayState>) -> Self {
        state.send_replace(ReplayState::Draining);
        Self { state, left: false }
    }

    fn leave(mut self, next: ReplayState) {
        self.state.send_replace(next);
        self.left = true;
    }
}

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        if !self.left {
            self.state.send_replace(ReplayState::Idle);
        }
    }
}
