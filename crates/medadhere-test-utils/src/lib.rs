// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for MedAdhere integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a network.
//!
//! # Components
//!
//! - [`MockSyncTarget`] - Sync target with per-call scripted failures, hangs, and holds
//! - [`MemoryQueueStore`] - Non-durable queue store with the SQLite store's contract
//! - [`TestHarness`] - SQLite-backed sync stack with restart support

pub mod harness;
pub mod memory_queue;
pub mod mock_sync;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_queue::MemoryQueueStore;
pub use mock_sync::MockSyncTarget;
