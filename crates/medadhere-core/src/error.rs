// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the MedAdhere offline sync core.

use thiserror::Error;

/// The primary error type used across all MedAdhere adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MedAdhereError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database unavailable, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The storage medium or the configured queue quota is exhausted.
    ///
    /// The action that triggered this error was NOT persisted.
    #[error("storage full: {message}")]
    StorageFull { message: String },

    /// The persisted queue could not be parsed.
    ///
    /// `raw` carries the exact stored blob so it can be quarantined instead of
    /// being overwritten.
    #[error("malformed persisted state under `{key}`: {reason}")]
    MalformedPersistedState {
        key: String,
        raw: String,
        reason: String,
    },

    /// Transport error or non-success response while delivering an action.
    #[error("delivery failed: {message}")]
    Delivery {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MedAdhereError {
    /// Returns true if this error means the queue could not accept more data.
    pub fn is_storage_full(&self) -> bool {
        matches!(self, MedAdhereError::StorageFull { .. })
    }

    /// Returns true if this error was raised while delivering to the remote target.
    ///
    /// Timeouts count as delivery failures.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            MedAdhereError::Delivery { .. } | MedAdhereError::Timeout { .. }
        )
    }
}
