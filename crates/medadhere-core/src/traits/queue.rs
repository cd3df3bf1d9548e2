// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue store trait for the durable log of pending actions.

use async_trait::async_trait;

use crate::error::MedAdhereError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Action, ActionId, QuarantinedBlob};

/// Durable, ordered log of actions awaiting remote delivery.
///
/// Implementations own the persisted sequence exclusively. Every mutation is
/// a single atomic read-modify-write, so concurrent callers never lose an
/// append. Actions leave the log only through [`clear`](QueueStore::clear) or
/// [`remove_delivered_prefix`](QueueStore::remove_delivered_prefix).
#[async_trait]
pub trait QueueStore: PluginAdapter {
    /// Appends an action to the end of the log.
    ///
    /// Returns [`MedAdhereError::StorageFull`] when the medium or quota is
    /// exhausted; the action is not persisted in that case.
    async fn enqueue(&self, action: &Action) -> Result<(), MedAdhereError>;

    /// Returns the full pending sequence without removing anything.
    async fn drain(&self) -> Result<Vec<Action>, MedAdhereError>;

    /// Empties the log.
    async fn clear(&self) -> Result<(), MedAdhereError>;

    /// Number of pending actions.
    async fn len(&self) -> Result<usize, MedAdhereError>;

    /// Returns true when nothing is pending.
    async fn is_empty(&self) -> Result<bool, MedAdhereError> {
        Ok(self.len().await? == 0)
    }

    /// Removes the leading actions whose ids match `delivered`, in order.
    ///
    /// Stops at the first mismatch, so actions appended after the caller's
    /// peek are never removed. Returns how many actions were removed.
    async fn remove_delivered_prefix(&self, delivered: &[ActionId])
    -> Result<usize, MedAdhereError>;

    /// Moves an unparseable persisted log aside, preserving it verbatim.
    ///
    /// Returns the quarantine record id, or `None` if there was nothing stored.
    async fn quarantine(&self, reason: &str) -> Result<Option<i64>, MedAdhereError>;

    /// Lists previously quarantined blobs, oldest first.
    async fn quarantined(&self) -> Result<Vec<QuarantinedBlob>, MedAdhereError>;
}
