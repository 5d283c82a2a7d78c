//! Checks and constructors shared by every matching strategy

use bigdecimal::BigDecimal;
use tracing::debug;

use crate::types::*;
use crate::utils::validation::validate_unit_interval;

/// Whether a transaction and a receipt may be paired at all.
///
/// Rejects pairings whose amounts have different signs or where either
/// amount is zero. Runs before any strategy-specific scoring.
pub fn validate_pairing(transaction: &Transaction, receipt: &Receipt) -> bool {
    let zero = BigDecimal::from(0);

    if transaction.amount == zero || receipt.amount == zero {
        debug!(
            transaction = %transaction.id,
            receipt = %receipt.id,
            "Pairing rejected: zero amount"
        );
        return false;
    }

    if (transaction.amount > zero) != (receipt.amount > zero) {
        debug!(
            transaction = %transaction.id,
            receipt = %receipt.id,
            "Pairing rejected: amount signs differ"
        );
        return false;
    }

    true
}

pub fn validate_confidence(confidence: f64) -> bool {
    validate_unit_interval(confidence, "Match confidence").is_ok()
}

/// Build a validated match linking `transaction` to `receipt`
pub fn build_match(
    transaction: &Transaction,
    receipt: Option<&Receipt>,
    confidence: f64,
    method: MatchMethod,
    observations: impl Into<String>,
) -> ReconResult<Match> {
    Match::new(
        transaction.id,
        receipt.map(|r| r.id),
        confidence,
        method,
        Some(observations.into()),
    )
}
