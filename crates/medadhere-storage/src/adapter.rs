// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the QueueStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use medadhere_config::model::{QueueConfig, StorageConfig};
use medadhere_core::{
    Action, ActionId, AdapterType, HealthStatus, MedAdhereError, PluginAdapter, QuarantinedBlob,
    QueueStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed offline action queue.
///
/// The database is opened lazily by [`SqliteQueueStore::initialize`]; every
/// other operation fails with a storage error until then.
pub struct SqliteQueueStore {
    storage: StorageConfig,
    max_pending: usize,
    db: OnceCell<Database>,
}

impl SqliteQueueStore {
    /// Create a store for the configured database file. Nothing is opened yet.
    pub fn new(storage: StorageConfig, queue: QueueConfig) -> Self {
        Self {
            storage,
            max_pending: queue.max_pending_actions,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database (in-memory databases in tests).
    pub fn with_database(db: Database, queue: QueueConfig) -> Self {
        Self {
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            max_pending: queue.max_pending_actions,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database and apply migrations.
    pub async fn initialize(&self) -> Result<(), MedAdhereError> {
        let path = self.storage.database_path.clone();
        let db = Database::open_with_wal(&path, self.storage.wal_mode).await?;
        self.db.set(db).map_err(|_| MedAdhereError::Storage {
            source: "queue store already initialized".into(),
        })?;
        debug!(path = %self.storage.database_path, "SQLite queue store initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, MedAdhereError> {
        self.db.get().ok_or_else(|| MedAdhereError::Storage {
            source: "queue store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteQueueStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::QueueStore
    }

    async fn health_check(&self) -> Result<HealthStatus, MedAdhereError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        // A corrupted queue is still reachable, just not usable.
        match queries::queue::pending(db).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(MedAdhereError::MalformedPersistedState { reason, .. }) => Ok(
                HealthStatus::Degraded(format!("persisted queue is malformed: {reason}")),
            ),
            Err(e) => Err(e),
        }
    }

    async fn shutdown(&self) -> Result<(), MedAdhereError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(&self, action: &Action) -> Result<(), MedAdhereError> {
        let stored = queries::queue::enqueue(self.db()?, action, self.max_pending).await?;
        debug!(id = %stored.id, kind = %stored.kind, "action enqueued");
        Ok(())
    }

    async fn drain(&self) -> Result<Vec<Action>, MedAdhereError> {
        queries::queue::pending(self.db()?).await
    }

    async fn clear(&self) -> Result<(), MedAdhereError> {
        queries::queue::clear(self.db()?).await
    }

    async fn len(&self) -> Result<usize, MedAdhereError> {
        Ok(queries::queue::pending(self.db()?).await?.len())
    }

    async fn remove_delivered_prefix(
        &self,
        delivered: &[ActionId],
    ) -> Result<usize, MedAdhereError> {
        queries::queue::remove_delivered_prefix(self.db()?, delivered).await
    }

    async fn quarantine(&self, reason: &str) -> Result<Option<i64>, MedAdhereError> {
        let id = queries::queue::quarantine(self.db()?, reason).await?;
        if let Some(id) = id {
            warn!(quarantine_id = id, reason, "corrupted offline queue quarantined");
        }
        Ok(id)
    }

    async fn quarantined(&self) -> Result<Vec<QuarantinedBlob>, MedAdhereError> {
        queries::queue::list_quarantined(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medadhere_core::ActionKind;
    use serde_json::json;

    async fn memory_store(max_pending: usize) -> SqliteQueueStore {
        let db = Database::open_in_memory().await.unwrap();
        SqliteQueueStore::with_database(
            db,
            QueueConfig {
                max_pending_actions: max_pending,
            },
        )
    }

    #[tokio::test]
    async fn uninitialized_store_reports_storage_error() {
        let store = SqliteQueueStore::new(StorageConfig::default(), QueueConfig::default());
        let err = store.drain().await.unwrap_err();
        assert!(err.to_string().contains("not initialized"), "got {err}");
    }

    #[tokio::test]
    async fn initialize_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            database_path: dir.path().join("q.db").display().to_string(),
            wal_mode: true,
        };
        let store = SqliteQueueStore::new(storage, QueueConfig::default());
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn trait_operations_round_through_sqlite() {
        let store = memory_store(10).await;
        assert!(store.is_empty().await.unwrap());

        let a = Action::new(ActionKind::MedicationAdd, json!({"id": 1, "name": "Metformin"}));
        let b = Action::new(ActionKind::MarkTaken, json!({"id": 1}));
        store.enqueue(&a).await.unwrap();
        store.enqueue(&b).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        let removed = store.remove_delivered_prefix(&[a.id]).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.drain().await.unwrap()[0].id, b.id);

        store.clear().await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn health_check_is_healthy_on_fresh_store() {
        let store = memory_store(10).await;
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        assert_eq!(store.adapter_type(), AdapterType::QueueStore);
    }

    #[tokio::test]
    async fn health_check_degrades_on_corrupted_queue() {
        let store = memory_store(10).await;
        store
            .db()
            .unwrap()
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv_store (key, value) VALUES (?1, 'not json')",
                    [crate::QUEUE_KEY],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
        assert!(store.quarantine("health check").await.unwrap().is_some());
        assert_eq!(store.quarantined().await.unwrap().len(), 1);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
