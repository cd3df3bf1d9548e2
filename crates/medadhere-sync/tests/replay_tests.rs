// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end replay behaviour over a real SQLite queue.

use std::sync::Arc;
use std::time::Duration;

use medadhere_config::model::{CommitMode, QueueConfig, StorageConfig, SyncConfig};
use medadhere_core::{Action, ActionKind, QueueStore};
use medadhere_storage::SqliteQueueStore;
use medadhere_sync::{
    HttpSyncTarget, IDEMPOTENCY_KEY, ReplayCoordinator, ReplayOutcome,
    ReplayState, SubmitOutcome,
};
use medadhere_test_utils::TestHarness;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn mark_taken(id: i64) -> Action {
    Action::new(ActionKind::MarkTaken, json!({"id": id}))
}

async fn enqueue_all(harness: &TestHarness, actions: &[Action]) {
    for action in actions {
        harness.queue.enqueue(action).await.unwrap();
    }
}

/// All N deliveries succeed: N calls in enqueue order.
#[tokio::test]
async fn fifo_delivery_of_every_pending_action() {
    let harness = TestHarness::builder().build().await.unwrap();
    let actions: Vec<Action> = (0..6).map(mark_taken).collect();
    enqueue_all(&harness, &actions).await;

    let outcome = harness.coordinator.replay().await.unwrap();
    assert_eq!(
        outcome,
        ReplayOutcome::Delivered {
            count: 6,
            remaining: 0
        }
    );
    assert_eq!(harness.target.attempted(), actions);
    assert!(harness.queue.is_empty().await.unwrap());
}

/// The k-th failure stops the pass and leaves all N actions queued.
#[tokio::test]
async fn failure_aborts_and_leaves_queue_untouched() {
    let harness = TestHarness::builder().build().await.unwrap();
    let actions: Vec<Action> = (0..5).map(mark_taken).collect();
    enqueue_all(&harness, &actions).await;
    harness.target.fail_on_call(3);

    let outcome = harness.coordinator.replay().await.unwrap();
    assert!(matches!(
        outcome,
        ReplayOutcome::Aborted {
            delivered: 2,
            removed: 0,
            ..
        }
    ));
    assert_eq!(harness.target.call_count(), 3);
    assert_eq!(harness.queue.drain().await.unwrap(), actions);
}

/// A later pass re-delivers the already confirmed prefix before moving on.
#[tokio::test]
async fn second_pass_redelivers_confirmed_prefix() {
    let harness = TestHarness::builder().build().await.unwrap();
    let actions: Vec<Action> = (0..4).map(mark_taken).collect();
    enqueue_all(&harness, &actions).await;
    harness.target.fail_on_call(3);

    harness.coordinator.replay().await.unwrap();
    let outcome = harness.coordinator.replay().await.unwrap();
    assert!(matches!(outcome, ReplayOutcome::Delivered { count: 4, .. }));

    let attempted = harness.target.attempted();
    let ids: Vec<_> = attempted.iter().map(|a| a.id).collect();
    let expected: Vec<_> = [0, 1, 2, 0, 1, 2, 3]
        .iter()
        .map(|&i| actions[i].id)
        .collect();
    assert_eq!(ids, expected);
    assert!(harness.queue.is_empty().await.unwrap());
}

/// Replaying an empty queue does nothing.
#[tokio::test]
async fn empty_replay_makes_no_calls() {
    let harness = TestHarness::builder().build().await.unwrap();
    assert_eq!(
        harness.coordinator.replay().await.unwrap(),
        ReplayOutcome::Empty
    );
    assert_eq!(
        harness.coordinator.replay().await.unwrap(),
        ReplayOutcome::Empty
    );
    assert_eq!(harness.target.call_count(), 0);
    assert!(harness.queue.is_empty().await.unwrap());
}

/// Three queued actions survive a restart and are delivered in order.
#[tokio::test]
async fn queued_actions_survive_restart() {
    let mut harness = TestHarness::builder().build().await.unwrap();
    let actions = vec![
        Action::new(ActionKind::MedicationAdd, json!({"id": 1, "name": "Metformin"})),
        mark_taken(1),
        Action::new(ActionKind::MedicationDelete, json!({"id": 1})),
    ];
    enqueue_all(&harness, &actions).await;

    harness.restart().await.unwrap();

    let outcome = harness.coordinator.replay().await.unwrap();
    assert!(matches!(outcome, ReplayOutcome::Delivered { count: 3, .. }));
    assert_eq!(harness.target.delivered(), actions);
}

#[tokio::test]
async fn add_then_mark_taken_are_delivered_in_order() {
    let harness = TestHarness::builder().build().await.unwrap();
    let add = Action::new(
        ActionKind::MedicationAdd,
        json!({"id": 1, "name": "Metformin"}),
    );
    let taken = Action::new(ActionKind::MarkTaken, json!({"id": 1}));
    harness.queue.enqueue(&add).await.unwrap();
    harness.queue.enqueue(&taken).await.unwrap();

    harness.coordinator.replay().await.unwrap();

    let delivered = harness.target.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].kind, ActionKind::MedicationAdd);
    assert_eq!(delivered[1].kind, ActionKind::MarkTaken);
    assert!(harness.queue.is_empty().await.unwrap());
    assert_eq!(harness.coordinator.state(), ReplayState::Settled);
}

#[tokio::test]
async fn first_call_failure_keeps_both_actions_unchanged() {
    let harness = TestHarness::builder().build().await.unwrap();
    let originals = vec![
        Action::new(
            ActionKind::MedicationAdd,
            json!({"id": 1, "name": "Metformin"}),
        ),
        mark_taken(1),
    ];
    enqueue_all(&harness, &originals).await;
    harness.target.fail_on_call(1);

    harness.coordinator.replay().await.unwrap();

    assert_eq!(harness.queue.len().await.unwrap(), 2);
    let after = harness.queue.drain().await.unwrap();
    assert_eq!(
        serde_json::to_string(&after).unwrap(),
        serde_json::to_string(&originals).unwrap()
    );
}

#[tokio::test]
async fn confirmed_prefix_mode_trims_on_abort() {
    let harness = TestHarness::builder()
        .with_commit_mode(CommitMode::ConfirmedPrefix)
        .build()
        .await
        .unwrap();
    let actions: Vec<Action> = (0..3).map(mark_taken).collect();
    enqueue_all(&harness, &actions).await;
    harness.target.fail_on_call(3);

    harness.coordinator.replay().await.unwrap();
    assert_eq!(harness.queue.drain().await.unwrap(), vec![actions[2].clone()]);

    harness.coordinator.replay().await.unwrap();
    // Only the failed action is sent again.
    assert_eq!(harness.target.call_count(), 4);
    assert!(harness.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn reconnect_triggers_replay() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .dispatcher
        .submit(ActionKind::MarkTaken, json!({"id": 9}))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let loop_handle = harness
        .connectivity
        .spawn_replay_on_reconnect(harness.coordinator.clone(), cancel.clone());

    let mut states = harness.coordinator.subscribe();
    harness.connectivity.set_online(true);
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ReplayState::Settled),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(harness.target.call_count(), 1);
    cancel.cancel();
    loop_handle.await.unwrap();
}

#[tokio::test]
async fn offline_dispatch_then_reconnect_end_to_end() {
    let harness = TestHarness::builder().build().await.unwrap();
    let outcome = harness
        .dispatcher
        .submit(
            ActionKind::AdrReport,
            json!({"medication": 1, "symptoms": "headache"}),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Queued { .. }));

    harness.connectivity.set_online(true);
    harness.coordinator.replay().await.unwrap();

    let outcome = harness
        .dispatcher
        .submit(ActionKind::MarkTaken, json!({"id": 1}))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Delivered { .. }));
    assert_eq!(harness.target.delivered().len(), 2);
}

/// SQLite queue plus the real HTTP target against a stub endpoint.
#[tokio::test]
async fn http_replay_sends_one_post_per_action_with_idempotency_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueueStore::new(
        StorageConfig {
            database_path: dir.path().join("q.db").display().to_string(),
            wal_mode: true,
        },
        QueueConfig::default(),
    ));
    queue.initialize().await.unwrap();

    let sync = SyncConfig {
        endpoint_url: format!("{}/api/sync", server.uri()),
        request_timeout_secs: 5,
        ..SyncConfig::default()
    };
    let target = Arc::new(HttpSyncTarget::new(&sync).unwrap());
    let coordinator = ReplayCoordinator::from_config(queue.clone(), target, &sync);

    let a = mark_taken(1);
    let b = mark_taken(2);
    queue.enqueue(&a).await.unwrap();
    queue.enqueue(&b).await.unwrap();

    let outcome = coordinator.replay().await.unwrap();
    assert!(matches!(outcome, ReplayOutcome::Delivered { count: 2, .. }));

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let keys: Vec<String> = requests
        .iter()
        .map(|r| {
            r.headers
                .get(IDEMPOTENCY_KEY)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(keys, vec![a.id.to_string(), b.id.to_string()]);
}

#[tokio::test]
async fn http_server_error_aborts_pass() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let queue = Arc::new(SqliteQueueStore::new(
        StorageConfig {
            database_path: dir.path().join("q.db").display().to_string(),
            wal_mode: true,
        },
        QueueConfig::default(),
    ));
    queue.initialize().await.unwrap();
    queue.enqueue(&mark_taken(1)).await.unwrap();
    queue.enqueue(&mark_taken(2)).await.unwrap();

    let sync = SyncConfig {
        endpoint_url: format!("{}/api/sync", server.uri()),
        ..SyncConfig::default()
    };
    let coordinator = ReplayCoordinator::from_config(
        queue.clone(),
        Arc::new(HttpSyncTarget::new(&sync).unwrap()),
        &sync,
    );

    let outcome = coordinator.replay().await.unwrap();
    assert!(matches!(outcome, ReplayOutcome::Aborted { delivered: 0, .. }));
    assert_eq!(queue.len().await.unwrap(), 2);
}

#[tracing_test::traced_test]
#[tokio::test]
async fn corrupted_queue_is_logged_and_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("q.db");
    let storage = StorageConfig {
        database_path: db_path.display().to_string(),
        wal_mode: true,
    };

    {
        let queue = SqliteQueueStore::new(storage.clone(), QueueConfig::default());
        queue.initialize().await.unwrap();
        medadhere_core::PluginAdapter::shutdown(&queue).await.unwrap();
    }
    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES ('offline_queue', 'garbage')",
            [],
        )
        .unwrap();
    }

    let queue = Arc::new(SqliteQueueStore::new(storage, QueueConfig::default()));
    queue.initialize().await.unwrap();
    let target = Arc::new(medadhere_test_utils::MockSyncTarget::new());
    let coordinator = ReplayCoordinator::new(
        queue.clone(),
        target.clone(),
        CommitMode::AllOrNothing,
        Duration::from_secs(5),
    );
    let outcome = coordinator.replay().await.unwrap();
    assert!(matches!(outcome, ReplayOutcome::Quarantined { .. }));
    assert!(logs_contain("moving it to quarantine"));
    assert_eq!(queue.quarantined().await.unwrap()[0].raw, "garbage");
    assert_eq!(target.call_count(), 0);
}
