//! SQLite storage medium.
//!
//! Persists item text in a single table so state survives process
//! restarts. The database runs in WAL mode for concurrent readers.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::storage::{validate_name, StateStorage};

/// SQLite implementation of [`StateStorage`].
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open or create a database at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite storage at {:?}", path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // A second connection would see a different in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS persist_items (
                name TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    /// Item names in lexicographic order.
    pub async fn names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM persist_items ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Unix time of the last write to an item.
    pub async fn updated_at(&self, name: &str) -> Result<Option<i64>> {
        validate_name(name)?;

        let row: Option<(i64,)> =
            sqlx::query_as("SELECT updated_at FROM persist_items WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(updated_at,)| updated_at))
    }

    /// Close the pool, waiting for open connections to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn now_unix() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl StateStorage for SqliteStorage {
    async fn get_item(&self, name: &str) -> Result<Option<String>> {
        validate_name(name)?;

        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM persist_items WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set_item(&self, name: &str, value: String) -> Result<()> {
        validate_name(name)?;

        sqlx::query(
            r#"
            INSERT INTO persist_items (name, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(&value)
        .bind(Self::now_unix())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove_item(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        sqlx::query("DELETE FROM persist_items WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
