//! In-memory ledger
//!
//! Available for all builds (not just tests) so integration tests and dry
//! runs can use it. Clones share state, which lets a test keep a handle for
//! assertions after handing the ledger to a selector or service.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Ledger, LedgerResult};
use crate::error::LedgerError;
use crate::types::RecordKey;

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashSet<(String, String)>,
    reads: usize,
    writes: usize,
    read_error: Option<String>,
    write_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger pre-populated with `(name, set)` entries
    pub fn with_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let ledger = Self::new();
        {
            let mut state = ledger.state();
            for (name, set) in entries {
                state.entries.insert((name.to_string(), set.to_string()));
            }
        }
        ledger
    }

    /// Make every read fail with `LedgerError::Unavailable`
    pub fn failing_reads(self, message: &str) -> Self {
        self.state().read_error = Some(message.to_string());
        self
    }

    /// Make every write fail with `LedgerError::Unavailable`
    pub fn failing_writes(self, message: &str) -> Self {
        self.state().write_error = Some(message.to_string());
        self
    }

    /// Number of `contains` calls, including failed ones
    pub fn read_count(&self) -> usize {
        self.state().reads
    }

    /// Number of `mark` calls, including failed ones
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn has_entry(&self, name: &str, set: &str) -> bool {
        self.state()
            .entries
            .contains(&(name.to_string(), set.to_string()))
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn contains(&self, key: RecordKey<'_>) -> LedgerResult<bool> {
        let mut state = self.state();
        state.reads += 1;

        if let Some(message) = &state.read_error {
            return Err(LedgerError::Unavailable(message.clone()));
        }

        Ok(state
            .entries
            .contains(&(key.name.to_string(), key.set.to_string())))
    }

    async fn mark(&self, key: RecordKey<'_>) -> LedgerResult<()> {
        let mut state = self.state();
        state.writes += 1;

        if let Some(message) = &state.write_error {
            return Err(LedgerError::Unavailable(message.clone()));
        }

        state
            .entries
            .insert((key.name.to_string(), key.set.to_string()));
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
