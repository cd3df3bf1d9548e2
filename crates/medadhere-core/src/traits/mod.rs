// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the MedAdhere sync core.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod queue;
pub mod sync;

pub use adapter::PluginAdapter;
pub use queue::QueueStore;
pub use sync::SyncTarget;
