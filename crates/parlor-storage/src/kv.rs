// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`KeyValueStore`] capability.

use async_trait::async_trait;
use parlor_config::model::StorageConfig;
use parlor_core::{KeyValueStore, ParlorError};
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::{map_tr_err, Database};

/// Key-value store persisted in the `kv` table.
pub struct SqliteKeyValueStore {
    db: Database,
}

impl SqliteKeyValueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database named by the storage configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, ParlorError> {
        let db = Database::open(&config.database_path).await?;
        Ok(Self::new(db))
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ParlorError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ParlorError> {
        let owned_key = key.to_string();
        let value = value.to_string();
        let bytes = value.len();
        let now = chrono::Utc::now().to_rfc3339();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                    params![owned_key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(key, bytes, "kv value written");
        Ok(())
    }
}
