//! SQLite-backed ledger for local runs

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use super::{Ledger, LedgerResult};
use crate::error::LedgerError;
use crate::types::RecordKey;

#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

fn unavailable(context: &str, error: impl std::fmt::Display) -> LedgerError {
    LedgerError::Unavailable(format!("{}: {}", context, error))
}

impl SqliteLedger {
    /// Open (or create) the ledger database at `db_path`
    pub async fn new(db_path: &str) -> LedgerResult<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| unavailable("failed to create ledger directory", e))?;
        }

        // Use forward slashes for SQLite URL (works on both Windows and Unix)
        // Use mode=rwc to allow creating the database file if it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(|e| unavailable("failed to open ledger database", e))?;

        Self::from_pool(pool).await
    }

    /// Open a private in-memory ledger
    pub async fn in_memory() -> LedgerResult<Self> {
        // A single connection, since every :memory: connection is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| unavailable("failed to open in-memory ledger", e))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> LedgerResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| unavailable("ledger migration failed", e))?;

        Ok(Self { pool })
    }

    /// Number of recorded entries
    pub async fn count(&self) -> LedgerResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ledger_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unavailable("ledger count failed", e))
    }

    /// When `key` was last marked, as a Unix timestamp
    pub async fn posted_at(&self, key: RecordKey<'_>) -> LedgerResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT posted_at FROM ledger_entries
            WHERE name = ? AND set_name = ?
            "#,
        )
        .bind(key.name)
        .bind(key.set)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("ledger lookup failed", e))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn contains(&self, key: RecordKey<'_>) -> LedgerResult<bool> {
        Ok(self.posted_at(key).await?.is_some())
    }

    async fn mark(&self, key: RecordKey<'_>) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (name, set_name, posted_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name, set_name)
            DO UPDATE SET posted_at = excluded.posted_at
            "#,
        )
        .bind(key.name)
        .bind(key.set)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("ledger write failed", e))?;

        Ok(())
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
