// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the MedAdhere offline action queue.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the crash-safe pending-action
//! log with quarantine for corrupted state.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteQueueStore;
pub use database::Database;
pub use queries::queue::QUEUE_KEY;
