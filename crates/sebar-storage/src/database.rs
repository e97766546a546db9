// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread: `Database` wraps a single `tokio_rusqlite::Connection`, query
//! modules accept `&Database` and call through `conn.call()`, and that single
//! writer is what makes the SELECT-then-UPDATE claim transactions atomic.
//! Do NOT create additional Connection instances for writes.

use std::time::Duration;

use sebar_core::SebarError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Handle to the engine's SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, configure PRAGMAs, and run
    /// all pending migrations.
    ///
    /// Migrations run on a blocking task with a short-lived direct connection
    /// before the async single-writer connection is established.
    pub async fn open(path: &str) -> Result<Self, SebarError> {
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), SebarError> {
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(|e| SebarError::Storage {
                    source: Box::new(e),
                })?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| SebarError::Internal(format!("migration task panicked: {e}")))??;

        let conn = Connection::open(path).await.map_err(|e| SebarError::Storage {
            source: Box::new(e),
        })?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the database, flushing the WAL.
    pub async fn close(self) -> Result<(), SebarError> {
        debug!("closing database");
        self.conn
            .close()
            .await
            .map_err(|e| SebarError::Storage {
                source: Box::new(e),
            })
    }
}

/// Map a tokio-rusqlite error into the crate-level storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> SebarError {
    SebarError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations_and_close_flushes() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // Migrated tables exist.
        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'table' AND name IN ('broadcast_jobs', 'scheduled_broadcasts')",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open must not re-apply migrations destructively.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }
}
