// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All reads and writes are serialized through tokio-rusqlite's single
//! background thread. Do NOT open additional connections for writes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parlor_core::ParlorError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection backing the key-value store.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ParlorError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Schema setup runs once on a short-lived blocking connection so the
        // refinery runner gets the `&mut rusqlite::Connection` it needs.
        let setup_path = path.clone();
        tokio::task::spawn_blocking(move || prepare(&setup_path))
            .await
            .map_err(|e| ParlorError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| ParlorError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path = %path.display(), "database opened");
        Ok(Self { conn, path })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn prepare(path: &Path) -> Result<(), ParlorError> {
    let mut conn = rusqlite::Connection::open(path).map_err(storage_err)?;
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(storage_err)?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(storage_err)?;
    migrations::run_migrations(&mut conn)?;
    debug!(journal_mode = %mode, "database schema ready");
    Ok(())
}

fn storage_err(e: rusqlite::Error) -> ParlorError {
    ParlorError::Storage {
        source: Box::new(e),
    }
}

pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParlorError {
    ParlorError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("parlor.db");
        let db = Database::open(&path).await.expect("open");
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());

        let tables: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.db");
        drop(Database::open(&path).await.unwrap());
        assert!(Database::open(&path).await.is_ok());
    }
}
