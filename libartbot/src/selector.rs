//! Duplicate-avoiding record selection
//!
//! Rejection sampling with a bounded retry budget:
//!
//! 1. Draw a record uniformly at random from the catalog.
//! 2. If the ledger already has it and fewer than `tolerance` collisions have
//!    been seen in this call, count the collision and draw again.
//! 3. Otherwise accept the record, duplicate or not, and mark it in the ledger.
//!
//! A call therefore performs at most `tolerance + 1` ledger reads and exactly
//! one ledger write. Read failures abort the selection; a write failure does
//! not, and is handed back in [`Selection::ledger_error`] so the caller can
//! report the weakened dedup guarantee.

use rand::Rng;

use crate::config::DEFAULT_TOLERANCE;
use crate::error::{ArtbotError, LedgerError, Result};
use crate::ledger::Ledger;
use crate::types::CatalogRecord;

/// The outcome of one [`Selector::select`] call
#[derive(Debug)]
pub struct Selection<'a> {
    /// The accepted record, borrowed from the catalog
    pub record: &'a CatalogRecord,
    /// Draws rejected because the ledger already had them
    pub resamples: usize,
    /// The accepted record was itself in the ledger (tolerance exhausted)
    pub duplicate: bool,
    /// Set when marking the accepted record in the ledger failed
    pub ledger_error: Option<LedgerError>,
}

impl Selection<'_> {
    /// Whether the ledger bookkeeping for this selection failed
    pub fn ledger_degraded(&self) -> bool {
        self.ledger_error.is_some()
    }
}

pub struct Selector<'l, L: Ledger + ?Sized> {
    ledger: &'l L,
    tolerance: usize,
}

impl<'l, L: Ledger + ?Sized> Selector<'l, L> {
    /// Create a selector with the default tolerance of 5 collisions
    pub fn new(ledger: &'l L) -> Self {
        Self {
            ledger,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Set how many collisions are tolerated before a duplicate is accepted
    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    /// Pick one record from `catalog`, avoiding recently posted ones
    ///
    /// # Errors
    ///
    /// - `ArtbotError::InvalidInput` if `catalog` is empty
    /// - `ArtbotError::Ledger` if a ledger read fails; no record is chosen
    pub async fn select<'a>(&self, catalog: &'a [CatalogRecord]) -> Result<Selection<'a>> {
        if catalog.is_empty() {
            return Err(ArtbotError::InvalidInput(
                "Cannot select from an empty catalog".to_string(),
            ));
        }

        let mut collisions = 0;
        let (record, duplicate) = loop {
            let record = &catalog[draw_index(catalog.len())];
            let seen = self.ledger.contains(record.key()).await?;

            if seen && collisions < self.tolerance {
                collisions += 1;
                tracing::debug!(record = %record, collisions, "already posted, drawing again");
                continue;
            }

            break (record, seen);
        };

        let ledger_error = match self.ledger.mark(record.key()).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    record = %record,
                    backend = self.ledger.backend_name(),
                    error = %e,
                    "failed to mark selected record; it may be posted again soon"
                );
                Some(e)
            }
        };

        tracing::info!(
            record = %record,
            resamples = collisions,
            duplicate,
            "selected record"
        );

        Ok(Selection {
            record,
            resamples: collisions,
            duplicate,
            ledger_error,
        })
    }
}

/// Uniform index in `0..len`
fn draw_index(len: usize) -> usize {
    rand::thread_rng().gen_range(0..len)
}
