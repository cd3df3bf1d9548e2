// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `QueueStore` with the same contract as the SQLite store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use medadhere_core::{
    Action, ActionId, AdapterType, HealthStatus, MedAdhereError, PluginAdapter, QuarantinedBlob,
    QueueStore,
};
use medadhere_storage::QUEUE_KEY;

enum Stored {
    Actions(Vec<Action>),
    Corrupt(String),
}

struct State {
    stored: Stored,
    quarantined: Vec<QuarantinedBlob>,
}

impl State {
    fn actions(&mut self) -> Result<&mut Vec<Action>, MedAdhereError> {
        match &mut self.stored {
            Stored::Actions(actions) => Ok(actions),
            Stored::Corrupt(raw) => Err(MedAdhereError::MalformedPersistedState {
                key: QUEUE_KEY.to_string(),
                reason: parse_error(raw),
                raw: raw.clone(),
            }),
        }
    }
}

fn parse_error(raw: &str) -> String {
    match serde_json::from_str::<Vec<Action>>(raw) {
        Ok(_) => "unexpected parse success".to_string(),
        Err(e) => e.to_string(),
    }
}

/// Queue store backed by a `Vec`, for tests that do not need durability.
pub struct MemoryQueueStore {
    state: Mutex<State>,
    max_pending: usize,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// A store that reports `StorageFull` once `max_pending` actions are queued.
    pub fn with_capacity(max_pending: usize) -> Self {
        Self {
            state: Mutex::new(State {
                stored: Stored::Actions(Vec::new()),
                quarantined: Vec::new(),
            }),
            max_pending,
        }
    }

    /// Replace the stored queue with an unparseable blob.
    pub fn corrupt(&self, raw: &str) {
        self.state().stored = Stored::Corrupt(raw.to_string());
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryQueueStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::QueueStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MedAdhereError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MedAdhereError> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(&self, action: &Action) -> Result<(), MedAdhereError> {
        let mut state = self.state();
        let actions = state.actions()?;
        if actions.len() >= self.max_pending {
            return Err(MedAdhereError::StorageFull {
                message: format!(
                    "offline queue holds {} actions (limit {})",
                    actions.len(),
                    self.max_pending
                ),
            });
        }
        let mut action = action.clone();
        action.stamp_after(actions.last());
        actions.push(action);
        Ok(())
    }

    async fn drain(&self) -> Result<Vec<Action>, MedAdhereError> {
        Ok(self.state().actions()?.clone())
    }

    async fn clear(&self) -> Result<(), MedAdhereError> {
        self.state().stored = Stored::Actions(Vec::new());
        Ok(())
    }

    async fn len(&self) -> Result<usize, MedAdhereError> {
        Ok(self.state().actions()?.len())
    }

    async fn remove_delivered_prefix(
        &self,
        delivered: &[ActionId],
    ) -> Result<usize, MedAdhereError> {
        let mut state = self.state();
        let actions = state.actions()?;
        let matched = actions
            .iter()
            .zip(delivered)
            .take_while(|(queued, id)| queued.id == **id)
            .count();
        actions.drain(..matched);
        Ok(matched)
    }

    async fn quarantine(&self, reason: &str) -> Result<Option<i64>, MedAdhereError> {
        let mut state = self.state();
        let Stored::Corrupt(raw) = &state.stored else {
            return Ok(None);
        };
        let id = state.quarantined.len() as i64 + 1;
        let blob = QuarantinedBlob {
            id,
            key: QUEUE_KEY.to_string(),
            raw: raw.clone(),
            reason: reason.to_string(),
            quarantined_at: chrono::Utc::now().to_rfc3339(),
        };
        state.quarantined.push(blob);
        state.stored = Stored::Actions(Vec::new());
        Ok(Some(id))
    }

    async fn quarantined(&self) -> Result<Vec<QuarantinedBlob>, MedAdhereError> {
        Ok(self.state().quarantined.clone())
    }
}
