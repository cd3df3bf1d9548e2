// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sync target trait for the remote side of replication.

use async_trait::async_trait;

use crate::error::MedAdhereError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Action;

/// Remote endpoint that accepts one action per call.
///
/// The target is expected to tolerate duplicate delivery of the same action;
/// each action carries a stable id it can deduplicate on.
#[async_trait]
pub trait SyncTarget: PluginAdapter {
    /// Delivers a single action. Any error counts as a delivery failure.
    async fn deliver(&self, action: &Action) -> Result<(), MedAdhereError>;
}
