// SPDX-FileCopyrightText: 2026 Wachat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `KeyValueStore` trait.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use wachat_config::model::StorageConfig;
use wachat_core::traits::{KeyValueStore, PluginAdapter};
use wachat_core::types::{AdapterType, HealthStatus};
use wachat_core::WachatError;

use crate::database::{Database, map_tr_err};

/// Key-value store backed by the `kv_entries` table.
pub struct SqliteKvStore {
    db: Database,
}

impl SqliteKvStore {
    /// Open the database described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, WachatError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// All stored keys in lexical order.
    pub async fn keys(&self) -> Result<Vec<String>, WachatError> {
        self.db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT key FROM kv_entries ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteKvStore {
    fn name(&self) -> &str {
        "sqlite-kv"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, WachatError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WachatError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, WachatError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), WachatError> {
        let key = key.to_string();
        let value = value.to_string();
        let bytes = value.len();
        let updated_at = chrono::Utc::now().to_rfc3339();
        let logged_key = key.clone();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(key = %logged_key, bytes, "kv entry written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), WachatError> {
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
