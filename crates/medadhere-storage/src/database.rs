// SPDX-FileCopyrightText: 2026 MedAdhere Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! `Database` wraps exactly one connection; query modules take `&Database` and
//! go through [`Database::connection`]. Do NOT open additional connections for writes.

use std::path::Path;
use std::time::Duration;

use medadhere_core::MedAdhereError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database backing the offline queue.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, MedAdhereError> {
        Self::open_with_wal(path, true).await
    }

    /// Open the database at `path`, choosing the journal mode explicitly.
    pub async fn open_with_wal(path: &str, wal_mode: bool) -> Result<Self, MedAdhereError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MedAdhereError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| MedAdhereError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> Result<Self, MedAdhereError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| MedAdhereError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    /// Returns the underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), MedAdhereError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and release the connection.
    pub async fn close(self) -> Result<(), MedAdhereError> {
        self.checkpoint().await?;
        debug!("database closed");
        Ok(())
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), MedAdhereError> {
        self.conn
            .call(
                move |conn| -> Result<Result<(), MedAdhereError>, rusqlite::Error> {
                    if wal_mode {
                        let _mode: String =
                            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                    }
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                    conn.busy_timeout(Duration::from_secs(5))?;
                    Ok(migrations::run_migrations(conn))
                },
            )
            .await
            .map_err(map_tr_err)?
    }
}

/// Convert a tokio-rusqlite error into `MedAdhereError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MedAdhereError {
    MedAdhereError::Storage {
        source: Box::new(e),
    }
}
