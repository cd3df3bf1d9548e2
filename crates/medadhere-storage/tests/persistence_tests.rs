// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue survives closing and reopening its database file.

use medadhere_config::model::{QueueConfig, StorageConfig};
use medadhere_core::{Action, ActionKind, PluginAdapter, QueueStore};
use medadhere_storage::SqliteQueueStore;
use serde_json::json;

fn storage_at(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        database_path: dir.path().join("medadhere.db").display().to_string(),
        wal_mode: true,
    }
}

#[tokio::test]
async fn pending_actions_survive_restart_in_order() {
    let dir = tempfile::tempdir().unwrap();

    let originals = vec![
        Action::new(ActionKind::MedicationAdd, json!({"id": 1, "name": "Metformin"})),
        Action::new(ActionKind::MarkTaken, json!({"id": 1})),
        Action::new(ActionKind::AdrReport, json!({"medication": 1, "symptoms": "nausea"})),
    ];

    {
        let store = SqliteQueueStore::new(storage_at(&dir), QueueConfig::default());
        store.initialize().await.unwrap();
        for action in &originals {
            store.enqueue(action).await.unwrap();
        }
        store.shutdown().await.unwrap();
    }

    let reopened = SqliteQueueStore::new(storage_at(&dir), QueueConfig::default());
    reopened.initialize().await.unwrap();
    let pending = reopened.drain().await.unwrap();
    assert_eq!(pending, originals);
}

#[tokio::test]
async fn quarantine_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medadhere.db");

    {
        let store = SqliteQueueStore::new(storage_at(&dir), QueueConfig::default());
        store.initialize().await.unwrap();
        store.shutdown().await.unwrap();
    }

    // Corrupt the stored queue behind the store's back.
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, '[{\"kind\":')",
            [medadhere_storage::QUEUE_KEY],
        )
        .unwrap();
    }

    let store = SqliteQueueStore::new(storage_at(&dir), QueueConfig::default());
    store.initialize().await.unwrap();
    assert!(store.drain().await.is_err());
    store.quarantine("corrupt on reopen").await.unwrap();
    store.shutdown().await.unwrap();

    let reopened = SqliteQueueStore::new(storage_at(&dir), QueueConfig::default());
    reopened.initialize().await.unwrap();
    assert!(reopened.is_empty().await.unwrap());
    let blobs = reopened.quarantined().await.unwrap();
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].raw, "[{\"kind\":");
}
