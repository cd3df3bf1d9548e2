// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline action queue operations.
//!
//! The whole pending sequence is stored as one JSON array under [`QUEUE_KEY`].
//! Every mutation is a read-modify-write inside a single transaction on the
//! writer thread, so two appends can never overwrite each other.

use medadhere_core::{Action, ActionId, MedAdhereError, QuarantinedBlob};
use rusqlite::{OptionalExtension, Transaction, params};
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};

/// Storage key holding the pending action sequence.
pub const QUEUE_KEY: &str = "offline_queue";

/// A domain-level failure detected inside a storage transaction.
#[derive(Debug)]
enum Fault {
    Full(String),
    Malformed { raw: String, reason: String },
    Encode(String),
}

impl Fault {
    fn into_error(self) -> MedAdhereError {
        match self {
            Fault::Full(message) => MedAdhereError::StorageFull { message },
            Fault::Malformed { raw, reason } => MedAdhereError::MalformedPersistedState {
                key: QUEUE_KEY.to_string(),
                raw,
                reason,
            },
            Fault::Encode(message) => MedAdhereError::Internal(message),
        }
    }
}

type TxResult<T> = Result<Result<T, Fault>, rusqlite::Error>;

/// Read and parse the pending sequence. A missing key is an empty queue.
fn load(tx: &Transaction<'_>) -> TxResult<Vec<Action>> {
    let raw: Option<String> = tx
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![QUEUE_KEY],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match raw {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str::<Vec<Action>>(&raw).map_err(|e| Fault::Malformed {
            reason: e.to_string(),
            raw,
        }),
    })
}

/// Persist the sequence, deleting the key when it is empty.
fn store(tx: &Transaction<'_>, actions: &[Action]) -> TxResult<()> {
    if actions.is_empty() {
        let deleted = tx.execute("DELETE FROM kv_store WHERE key = ?1", params![QUEUE_KEY]);
        return full_or(deleted.map(|_| ()));
    }

    let encoded = match serde_json::to_string(actions) {
        Ok(encoded) => encoded,
        Err(e) => return Ok(Err(Fault::Encode(format!("failed to encode queue: {e}")))),
    };

    let written = tx.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
             value = excluded.value,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![QUEUE_KEY, encoded],
    );
    full_or(written.map(|_| ()))
}

/// Commit, reporting an exhausted medium as `Full`. In WAL mode pages are
/// usually written here rather than by the statement.
fn commit(tx: Transaction<'_>) -> TxResult<()> {
    full_or(tx.commit())
}

fn full_or<T>(result: Result<T, rusqlite::Error>) -> TxResult<T> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if is_disk_full(&e) => Ok(Err(Fault::Full(e.to_string()))),
        Err(e) => Err(e),
    }
}

fn is_disk_full(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(rusqlite::ErrorCode::DiskFull)
}

/// Append `action` to the end of the queue.
///
/// If the clock moved backwards since the tail was written, the stored copy
/// is stamped with the tail's timestamp. Returns the action as persisted.
/// Fails with `StorageFull` when `max_pending` actions are already queued or
/// the disk is full, and with `MalformedPersistedState` when the stored
/// sequence cannot be parsed (it is never overwritten).
pub async fn enqueue(
    db: &Database,
    action: &Action,
    max_pending: usize,
) -> Result<Action, MedAdhereError> {
    let mut action = action.clone();
    db.connection()
        .call(move |conn| -> TxResult<Action> {
            let tx = conn.transaction()?;
            let mut actions = match load(&tx)? {
                Ok(actions) => actions,
                Err(fault) => return Ok(Err(fault)),
            };

            if actions.len() >= max_pending {
                return Ok(Err(Fault::Full(format!(
                    "offline queue holds {} actions (limit {max_pending})",
                    actions.len()
                ))));
            }

            if action.stamp_after(actions.last()) {
                debug!(id = %action.id, "clock skew: enqueued_at raised to queue tail");
            }
            actions.push(action.clone());

            if let Err(fault) = store(&tx, &actions)? {
                return Ok(Err(fault));
            }
            if let Err(fault) = commit(tx)? {
                return Ok(Err(fault));
            }
            Ok(Ok(action))
        })
        .await
        .map_err(map_tr_err)?
        .map_err(Fault::into_error)
}

/// Return the full pending sequence without modifying it.
pub async fn pending(db: &Database) -> Result<Vec<Action>, MedAdhereError> {
    db.connection()
        .call(|conn| -> TxResult<Vec<Action>> {
            let tx = conn.transaction()?;
            let loaded = load(&tx)?;
            tx.commit()?;
            Ok(loaded)
        })
        .await
        .map_err(map_tr_err)?
        .map_err(Fault::into_error)
}

/// Remove every pending action.
pub async fn clear(db: &Database) -> Result<(), MedAdhereError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![QUEUE_KEY])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove the leading actions whose ids match `delivered`, in order.
///
/// Stops at the first id that does not match the queue head, so anything
/// appended after the caller read the queue stays put. Returns the number
/// of actions removed.
pub async fn remove_delivered_prefix(
    db: &Database,
    delivered: &[ActionId],
) -> Result<usize, MedAdhereError> {
    if delivered.is_empty() {
        return Ok(0);
    }
    let delivered = delivered.to_vec();
    db.connection()
        .call(move |conn| -> TxResult<usize> {
            let tx = conn.transaction()?;
            let mut actions = match load(&tx)? {
                Ok(actions) => actions,
                Err(fault) => return Ok(Err(fault)),
            };

            let matched = actions
                .iter()
                .zip(delivered.iter())
                .take_while(|(queued, id)| queued.id == **id)
                .count();
            if matched < delivered.len() {
                warn!(
                    matched,
                    expected = delivered.len(),
                    "queue head diverged from delivered prefix"
                );
            }
            if matched == 0 {
                return Ok(Ok(0));
            }

            actions.drain(..matched);
            if let Err(fault) = store(&tx, &actions)? {
                return Ok(Err(fault));
            }
            if let Err(fault) = commit(tx)? {
                return Ok(Err(fault));
            }
            Ok(Ok(matched))
        })
        .await
        .map_err(map_tr_err)?
        .map_err(Fault::into_error)
}

/// Move the stored queue blob into `quarantined_blobs` if it cannot be parsed.
///
/// A parseable queue is left alone. Returns the quarantine row id when a blob
/// was moved.
pub async fn quarantine(db: &Database, reason: &str) -> Result<Option<i64>, MedAdhereError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let raw: Option<String> = tx
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![QUEUE_KEY],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(raw) = raw else {
                return Ok(None);
            };
            if serde_json::from_str::<Vec<Action>>(&raw).is_ok() {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO quarantined_blobs (key, raw, reason) VALUES (?1, ?2, ?3)",
                params![QUEUE_KEY, raw, reason],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute("DELETE FROM kv_store WHERE key = ?1", params![QUEUE_KEY])?;
            tx.commit()?;
            Ok(Some(id))
        })
        .await
        .map_err(map_tr_err)
}

/// List quarantined blobs, oldest first.
pub async fn list_quarantined(db: &Database) -> Result<Vec<QuarantinedBlob>, MedAdhereError> {
    db.connection()
        .call(|conn| -> Result<Vec<QuarantinedBlob>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, key, raw, reason, quarantined_at
                 FROM quarantined_blobs ORDER BY id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(QuarantinedBlob {
                    id: row.get(0)?,
                    key: row.get(1)?,
                    raw: row.get(2)?,
                    reason: row.get(3)?,
                    quarantined_at: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
