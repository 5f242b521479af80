//! Dedup ledger: the "recently posted" presence store
//!
//! A ledger answers one question, "has this `(name, set)` been selected
//! before?", and records new selections with an idempotent upsert. There is
//! no compare-and-set: callers read, decide, then write, and two racing
//! invocations may both pick the same record.
//!
//! # Backends
//!
//! - [`dynamodb::DynamoLedger`]: production table keyed by `name`/`set`
//! - [`sqlite::SqliteLedger`]: local file for cron-driven CLI runs
//! - [`memory::MemoryLedger`]: in-process, with failure injection for tests
//! - [`ReadOnlyLedger`]: wraps another ledger and drops writes (dry runs)

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::LedgerError;
use crate::types::RecordKey;

pub mod dynamodb;
pub mod memory;
pub mod sqlite;

pub use dynamodb::DynamoLedger;
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Check whether an entry exists for `key`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unavailable` if the store cannot answer. Callers
    /// must not treat an error as absence.
    async fn contains(&self, key: RecordKey<'_>) -> LedgerResult<bool>;

    /// Insert or overwrite the entry for `key`
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unavailable` if the write did not reach the store.
    async fn mark(&self, key: RecordKey<'_>) -> LedgerResult<()>;

    /// Short identifier for logs (e.g., "dynamodb", "sqlite")
    fn backend_name(&self) -> &str;
}

/// Ledger wrapper that answers reads from the inner ledger and discards writes
pub struct ReadOnlyLedger {
    inner: Arc<dyn Ledger>,
}

impl ReadOnlyLedger {
    pub fn new(inner: Arc<dyn Ledger>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Ledger for ReadOnlyLedger {
    async fn contains(&self, key: RecordKey<'_>) -> LedgerResult<bool> {
        self.inner.contains(key).await
    }

    async fn mark(&self, key: RecordKey<'_>) -> LedgerResult<()> {
        tracing::info!(record = %key, "read-only ledger: skipping write");
        Ok(())
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }
}
