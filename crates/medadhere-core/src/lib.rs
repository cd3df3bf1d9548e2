// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the MedAdhere offline sync core.
//!
//! This crate provides the action types, the error type, and the adapter
//! traits (queue store and sync target) shared by every other crate in the
//! workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MedAdhereError;
pub use types::{Action, ActionId, ActionKind, AdapterType, HealthStatus, QuarantinedBlob};

pub use traits::{PluginAdapter, QueueStore, SyncTarget};
