//! Traits for matching strategies and the collaborators around the engine

use async_trait::async_trait;
use std::collections::HashSet;

use crate::types::*;

/// A pluggable matching algorithm tried by the engine in cascade order.
///
/// Implementations must not mutate the transaction or any receipt, must treat
/// `used` as read-only, and must never return a receipt whose handle is
/// already in `used`.
pub trait MatchingStrategy: Send + Sync {
    /// Descriptive name, used in logs and observations
    fn name(&self) -> &str;

    /// Cascade position: higher values are evaluated first
    fn priority(&self) -> i32;

    /// Find the best match for `transaction`, if any
    fn find_match(
        &self,
        transaction: &Transaction,
        receipts: &[Receipt],
        used: &HashSet<ReceiptId>,
    ) -> ReconResult<Option<Match>>;
}

/// Source of parsed bank statement lines (CSV/PDF ingestion lives behind it)
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Load every transaction of the statement, in statement order
    async fn load_transactions(&self) -> ReconResult<Vec<Transaction>>;
}

/// Source of payment receipts (OCR extraction lives behind it)
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// Load every receipt available for reconciliation
    async fn load_receipts(&self) -> ReconResult<Vec<Receipt>>;
}

/// Destination for completed runs (JSON/Excel/PDF exporters live behind it)
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Persist the matches produced by one run
    async fn save_matches(&mut self, matches: &[Match]) -> ReconResult<()>;

    /// Load every match stored so far
    async fn load_matches(&self) -> ReconResult<Vec<Match>>;
}
