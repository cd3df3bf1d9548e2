// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the queue, sync target, and coordinators from configuration.

use std::sync::Arc;
use std::time::Duration;

use medadhere_config::MedAdhereConfig;
use medadhere_core::MedAdhereError;
use medadhere_storage::SqliteQueueStore;
use medadhere_sync::{ActionDispatcher, ConnectivityMonitor, HttpSyncTarget, ReplayCoordinator};

/// The sync components every command works against.
pub struct SyncStack {
    pub queue: Arc<SqliteQueueStore>,
    pub target: Arc<HttpSyncTarget>,
    pub coordinator: Arc<ReplayCoordinator>,
    pub connectivity: Arc<ConnectivityMonitor>,
}

impl SyncStack {
    /// Open the queue database and build the HTTP target.
    ///
    /// Connectivity starts offline; callers decide when to probe.
    pub async fn open(config: &MedAdhereConfig) -> Result<Self, MedAdhereError> {
        let queue = Arc::new(SqliteQueueStore::new(
            config.storage.clone(),
            config.queue.clone(),
        ));
        queue.initialize().await?;

        let target = Arc::new(HttpSyncTarget::new(&config.sync)?);
        let coordinator = Arc::new(ReplayCoordinator::from_config(
            queue.clone(),
            target.clone(),
            &config.sync,
        ));

        Ok(Self {
            queue,
            target,
            coordinator,
            connectivity: Arc::new(ConnectivityMonitor::new(false)),
        })
    }

    pub fn dispatcher(&self) -> ActionDispatcher {
        ActionDispatcher::new(
            self.queue.clone(),
            self.target.clone(),
            self.connectivity.clone(),
            self.coordinator.clone(),
        )
    }

    /// Probe the sync endpoint once and publish the result. Returns the new state.
    pub async fn probe(&self, timeout: Duration) -> bool {
        let online = self.target.probe(timeout).await;
        self.connectivity.set_online(online);
        online
    }
}
