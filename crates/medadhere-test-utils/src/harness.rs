// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end sync testing.
//!
//! `TestHarness` wires a SQLite queue in a temp directory to a
//! [`MockSyncTarget`], a replay coordinator, a connectivity monitor, and an
//! action dispatcher. [`TestHarness::restart`] reopens the database file to
//! simulate a process restart.

use std::sync::Arc;
use std::time::Duration;

use medadhere_config::model::{CommitMode, QueueConfig, StorageConfig};
use medadhere_core::{MedAdhereError, PluginAdapter};
use medadhere_storage::SqliteQueueStore;
use medadhere_sync::{ActionDispatcher, ConnectivityMonitor, ReplayCoordinator};

use crate::mock_sync::MockSyncTarget;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    commit_mode: CommitMode,
    max_pending: usize,
    online: bool,
    delivery_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            commit_mode: CommitMode::AllOrNothing,
            max_pending: QueueConfig::default().max_pending_actions,
            online: false,
            delivery_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.commit_mode = mode;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Start with the connectivity signal online.
    pub fn online(mut self) -> Self {
        self.online = true;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Create the temp database and wire everything together.
    pub async fn build(self) -> Result<TestHarness, MedAdhereError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| MedAdhereError::Storage { source: e.into() })?;
        let database_path = temp_dir
            .path()
            .join("medadhere.db")
            .to_string_lossy()
            .into_owned();

        let target = Arc::new(MockSyncTarget::new());
        let connectivity = Arc::new(ConnectivityMonitor::new(self.online));
        let parts = Parts::open(&database_path, &self, &target, &connectivity).await?;

        Ok(TestHarness {
            queue: parts.queue,
            target,
            coordinator: parts.coordinator,
            connectivity,
            dispatcher: parts.dispatcher,
            database_path,
            options: self,
            _temp_dir: temp_dir,
        })
    }
}

struct Parts {
    queue: Arc<SqliteQueueStore>,
    coordinator: Arc<ReplayCoordinator>,
    dispatcher: ActionDispatcher,
}

impl Parts {
    async fn open(
        database_path: &str,
        options: &TestHarnessBuilder,
        target: &Arc<MockSyncTarget>,
        connectivity: &Arc<ConnectivityMonitor>,
    ) -> Result<Self, MedAdhereError> {
        let queue = Arc::new(SqliteQueueStore::new(
            StorageConfig {
                database_path: database_path.to_string(),
                wal_mode: true,
            },
            QueueConfig {
                max_pending_actions: options.max_pending,
            },
        ));
        queue.initialize().await?;

        let coordinator = Arc::new(ReplayCoordinator::new(
            queue.clone(),
            target.clone(),
            options.commit_mode,
            options.delivery_timeout,
        ));
        let dispatcher = ActionDispatcher::new(
            queue.clone(),
            target.clone(),
            connectivity.clone(),
            coordinator.clone(),
        );

        Ok(Self {
            queue,
            coordinator,
            dispatcher,
        })
    }
}

/// A complete sync stack over a temp SQLite file and a mock target.
pub struct TestHarness {
    /// SQLite queue (temp DB, cleaned up on drop).
    pub queue: Arc<SqliteQueueStore>,
    /// Scriptable remote target.
    pub target: Arc<MockSyncTarget>,
    pub coordinator: Arc<ReplayCoordinator>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub dispatcher: ActionDispatcher,
    /// Path of the SQLite file backing `queue`.
    pub database_path: String,
    options: TestHarnessBuilder,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Close the queue and open a fresh store, coordinator, and dispatcher
    /// on the same file. The mock target and connectivity signal are kept.
    pub async fn restart(&mut self) -> Result<(), MedAdhereError> {
        self.queue.shutdown().await?;
        let parts = Parts::open(
            &self.database_path,
            &self.options,
            &self.target,
            &self.connectivity,
        )
        .await?;
        self.queue = parts.queue;
        self.coordinator = parts.coordinator;
        self.dispatcher = parts.dispatcher;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medadhere_core::{ActionKind, QueueStore};
    use serde_json::json;

    #[tokio::test]
    async fn harness_builds_offline_by_default() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(!harness.connectivity.is_online());
        assert!(harness.queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn restart_keeps_queued_actions() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        harness
            .dispatcher
            .submit(ActionKind::MarkTaken, json!({"id": 1}))
            .await
            .unwrap();

        harness.restart().await.unwrap();
        assert_eq!(harness.queue.len().await.unwrap(), 1);
    }
}
