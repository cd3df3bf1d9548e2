// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for user actions.
//!
//! An action is delivered directly when the device is online and nothing is
//! queued ahead of it; otherwise it is appended to the queue. Local side
//! effects (reminders) are applied either way and are never rolled back by a
//! delivery failure.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use medadhere_core::{Action, ActionId, ActionKind, MedAdhereError, QueueStore, SyncTarget};
use medadhere_reminders::{MedicationReminder, ReminderScheduler, medication_id};

use crate::connectivity::ConnectivityMonitor;
use crate::replay::ReplayCoordinator;

/// What happened to a submitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The sync target accepted the action immediately.
    Delivered { id: ActionId },
    /// The action was saved locally and will be sent on the next replay.
    Queued { id: ActionId },
}

pub struct ActionDispatcher {
    queue: Arc<dyn QueueStore>,
    target: Arc<dyn SyncTarget>,
    connectivity: Arc<ConnectivityMonitor>,
    coordinator: Arc<ReplayCoordinator>,
    reminders: Option<Arc<ReminderScheduler>>,
}

impl ActionDispatcher {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        target: Arc<dyn SyncTarget>,
        connectivity: Arc<ConnectivityMonitor>,
        coordinator: Arc<ReplayCoordinator>,
    ) -> Self {
        Self {
            queue,
            target,
            connectivity,
            coordinator,
            reminders: None,
        }
    }

    /// Schedule and cancel medication reminders as actions pass through.
    pub fn with_reminders(mut self, reminders: Arc<ReminderScheduler>) -> Self {
        self.reminders = Some(reminders);
        self
    }

    /// Build an action from `kind` and `payload` and submit it.
    pub async fn submit(
        &self,
        kind: ActionKind,
        payload: serde_json::Value,
    ) -> Result<SubmitOutcome, MedAdhereError> {
        self.submit_action(Action::new(kind, payload)).await
    }

    /// Submit a prepared action.
    ///
    /// Submits are serialized with each other and with replay passes, so
    /// actions reach the sync target in submission order whichever path they
    /// take. Returns an error only when the action could not be delivered and
    /// could not be saved either (`StorageFull`, `Storage`).
    pub async fn submit_action(&self, action: Action) -> Result<SubmitOutcome, MedAdhereError> {
        self.apply_local_effects(&action);

        let _lane = self.coordinator.delivery_lane().await;
        if self.can_deliver_directly().await {
            let timeout = self.coordinator.delivery_timeout();
            let result = tokio::time::timeout(timeout, self.target.deliver(&action))
                .await
                .unwrap_or_else(|_| Err(MedAdhereError::Timeout { duration: timeout }));
            match result {
                Ok(()) => {
                    medadhere_prometheus::record_delivered(&action.kind);
                    debug!(id = %action.id, kind = %action.kind, "action delivered directly");
                    return Ok(SubmitOutcome::Delivered { id: action.id });
                }
                Err(e) => {
                    medadhere_prometheus::record_delivery_failure(&e);
                    warn!(
                        id = %action.id,
                        kind = %action.kind,
                        error = %e,
                        "direct delivery failed, queueing instead"
                    );
                }
            }
        }

        self.enqueue(&action).await?;
        Ok(SubmitOutcome::Queued { id: action.id })
    }

    /// Direct delivery must not overtake anything already queued. Called with
    /// the delivery lane held, so no pass is running.
    async fn can_deliver_directly(&self) -> bool {
        self.connectivity.is_online() && matches!(self.queue.is_empty().await, Ok(true))
    }

    async fn enqueue(&self, action: &Action) -> Result<(), MedAdhereError> {
        match self.queue.enqueue(action).await {
            Ok(()) => {}
            Err(MedAdhereError::MalformedPersistedState { reason, .. }) => {
                error!(
                    reason = %reason,
                    "persisted queue is malformed, quarantining before enqueue"
                );
                self.queue.quarantine(&reason).await?;
                self.queue.enqueue(action).await?;
            }
            Err(e) => {
                error!(id = %action.id, kind = %action.kind, error = %e, "failed to queue action");
                return Err(e);
            }
        }

        medadhere_prometheus::record_enqueued(&action.kind);
        self.coordinator.note_enqueued();
        info!(id = %action.id, kind = %action.kind, "action saved for replay");
        Ok(())
    }

    fn apply_local_effects(&self, action: &Action) {
        let Some(reminders) = &self.reminders else {
            return;
        };
        match action.kind {
            ActionKind::MedicationAdd => match MedicationReminder::from_payload(&action.payload) {
                Some(reminder) => reminders.schedule(reminder),
                None => debug!(id = %action.id, "medication has no valid reminder time"),
            },
            ActionKind::MedicationDelete => {
                if let Some(medication) = medication_id(&action.payload) {
                    reminders.cancel(&medication);
                }
            }
            _ => {}
        }
    }
}
