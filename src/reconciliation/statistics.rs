//! Aggregate statistics over a completed reconciliation run

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::*;

/// Lower bound of the low confidence band
pub const LOW_CONFIDENCE_FLOOR: f64 = 0.60;

/// Match counts per confidence band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    /// >= 0.90
    pub high: usize,
    /// [0.70, 0.90)
    pub medium: usize,
    /// [0.60, 0.70)
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationStatistics {
    pub total_transactions: usize,
    pub total_matches: usize,
    /// Matches over transactions, in [0, 1]
    pub reconciliation_rate: f64,
    pub mean_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub auto_approved: usize,
    pub review_required: usize,
    /// Sum of the amounts of the matched transactions
    pub total_reconciled_value: BigDecimal,
    pub by_method: BTreeMap<MatchMethod, usize>,
    pub confidence_buckets: ConfidenceBuckets,
}

impl ReconciliationStatistics {
    /// Compute statistics for `matches` produced from `transactions`.
    ///
    /// Pure: the same inputs always produce the same output.
    pub fn compute(
        matches: &[Match],
        transactions: &[Transaction],
        auto_approve_threshold: f64,
    ) -> Self {
        let total_transactions = transactions.len();
        let total_matches = matches.len();

        let reconciliation_rate = if total_transactions == 0 {
            0.0
        } else {
            total_matches as f64 / total_transactions as f64
        };

        if matches.is_empty() {
            return Self {
                total_transactions,
                total_matches,
                reconciliation_rate,
                mean_confidence: 0.0,
                min_confidence: 0.0,
                max_confidence: 0.0,
                auto_approved: 0,
                review_required: 0,
                total_reconciled_value: BigDecimal::from(0),
                by_method: BTreeMap::new(),
                confidence_buckets: ConfidenceBuckets::default(),
            };
        }

        let confidences: Vec<f64> = matches.iter().map(|m| m.confidence).collect();
        let mean_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let min_confidence = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max_confidence = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let auto_approved = confidences
            .iter()
            .filter(|c| **c >= auto_approve_threshold)
            .count();

        let amounts: HashMap<TransactionId, &BigDecimal> =
            transactions.iter().map(|t| (t.id, &t.amount)).collect();
        let total_reconciled_value = matches
            .iter()
            .filter_map(|m| amounts.get(&m.transaction_id))
            .fold(BigDecimal::from(0), |acc, amount| acc + *amount);

        let mut by_method = BTreeMap::new();
        for m in matches {
            *by_method.entry(m.method).or_insert(0) += 1;
        }

        let mut confidence_buckets = ConfidenceBuckets::default();
        for confidence in &confidences {
            if *confidence >= AUTO_APPROVE_CONFIDENCE {
                confidence_buckets.high += 1;
            } else if *confidence >= MEDIUM_CONFIDENCE {
                confidence_buckets.medium += 1;
            } else if *confidence >= LOW_CONFIDENCE_FLOOR {
                confidence_buckets.low += 1;
            }
        }

        Self {
            total_transactions,
            total_matches,
            reconciliation_rate,
            mean_confidence,
            min_confidence,
            max_confidence,
            auto_approved,
            review_required: total_matches - auto_approved,
            total_reconciled_value,
            by_method,
            confidence_buckets,
        }
    }

    /// Transactions left without a match
    pub fn unmatched(&self) -> usize {
        self.total_transactions.saturating_sub(self.total_matches)
    }
}
