// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the MedAdhere sync core.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identifier for an action, sent to the remote side for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub uuid::Uuid);

impl ActionId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Operation family of an action.
///
/// The set is open: any other tag, including older spellings such as
/// `markTaken`, is kept verbatim in [`ActionKind::Other`]. Stored tags are
/// never rewritten when the queue is re-persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    MedicationAdd,
    MarkTaken,
    MedicationDelete,
    AdrReport,
    Other(String),
}

impl ActionKind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::MedicationAdd => "medication-add",
            ActionKind::MarkTaken => "mark-taken",
            ActionKind::MedicationDelete => "medication-delete",
            ActionKind::AdrReport => "adr-report",
            ActionKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for ActionKind {
    fn from(tag: &str) -> Self {
        match tag {
            "medication-add" => ActionKind::MedicationAdd,
            "mark-taken" => ActionKind::MarkTaken,
            "medication-delete" => ActionKind::MedicationDelete,
            "adr-report" => ActionKind::AdrReport,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        ActionKind::from(tag.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durable record of one user-initiated mutation awaiting remote delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Unique id, generated at creation.
    pub id: ActionId,
    /// Operation family.
    pub kind: ActionKind,
    /// Kind-specific data, opaque to the queue.
    pub payload: serde_json::Value,
    /// Creation time in milliseconds since the Unix epoch.
    pub enqueued_at: i64,
}

impl Action {
    /// Create an action stamped with the current time.
    pub fn new(kind: ActionKind, payload: serde_json::Value) -> Self {
        Self::with_timestamp(kind, payload, chrono::Utc::now().timestamp_millis())
    }

    /// Create an action with an explicit creation timestamp.
    pub fn with_timestamp(kind: ActionKind, payload: serde_json::Value, enqueued_at: i64) -> Self {
        Self {
            id: ActionId::new(),
            kind,
            payload,
            enqueued_at,
        }
    }

    /// Raise `enqueued_at` to the tail's timestamp if the clock went backwards.
    ///
    /// Keeps `enqueued_at` non-decreasing across the persisted sequence.
    /// Returns true if the timestamp was adjusted.
    pub fn stamp_after(&mut self, tail: Option<&Action>) -> bool {
        match tail {
            Some(tail) if tail.enqueued_at > self.enqueued_at => {
                self.enqueued_at = tail.enqueued_at;
                true
            }
            _ => false,
        }
    }
}

/// A persisted blob that failed to parse and was moved aside for recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedBlob {
    pub id: i64,
    /// Storage key the blob was found under.
    pub key: String,
    /// The exact bytes that were stored, as text.
    pub raw: String,
    /// Why it was quarantined.
    pub reason: String,
    /// ISO 8601 timestamp.
    pub quarantined_at: String,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    QueueStore,
    SyncTarget,
    Observability,
}
