//! Exact-match strategy: amount equality plus date proximity scoring

use bigdecimal::BigDecimal;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::ExactMatchConfig;
use crate::strategies::base::{build_match, validate_pairing};
use crate::traits::MatchingStrategy;
use crate::types::*;
use crate::utils::validation::jaccard_similarity;

/// Candidates scoring below this are never returned
pub const EXACT_MATCH_FLOOR: f64 = 0.60;

const EXACT_AMOUNT_SCORE: f64 = 0.50;
const SAME_DAY_SCORE: f64 = 0.30;
const ONE_DAY_SCORE: f64 = 0.25;
const TWO_DAYS_SCORE: f64 = 0.20;
const WITHIN_WINDOW_SCORE: f64 = 0.15;
const DESCRIPTION_SCORE: f64 = 0.15;
const OCR_SCORE: f64 = 0.05;

/// Pairs a transaction with the unused receipt of equal amount whose date is
/// closest, within a configurable window
#[derive(Debug, Clone)]
pub struct ExactMatchStrategy {
    config: ExactMatchConfig,
}

impl ExactMatchStrategy {
    pub const NAME: &'static str = "Exact Match";
    pub const PRIORITY: i32 = 10;

    /// Create the strategy, rejecting invalid configuration up front
    pub fn new(config: ExactMatchConfig) -> ReconResult<Self> {
        config.validate()?;
        info!(
            date_tolerance_days = config.date_tolerance_days,
            amount_tolerance = %config.amount_tolerance,
            use_description = config.use_description,
            "Exact match strategy configured"
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &ExactMatchConfig {
        &self.config
    }

    fn amount_difference(transaction: &Transaction, receipt: &Receipt) -> BigDecimal {
        (&transaction.amount - &receipt.amount).abs()
    }

    fn day_difference(transaction: &Transaction, receipt: &Receipt) -> i64 {
        (receipt.date - transaction.date).num_days().abs()
    }

    fn passes_gates(&self, transaction: &Transaction, receipt: &Receipt) -> bool {
        Self::amount_difference(transaction, receipt) <= self.config.amount_tolerance
            && Self::day_difference(transaction, receipt) <= self.config.date_tolerance_days
    }

    /// Additive score of a pairing, clamped to [0, 1]
    pub fn score(&self, transaction: &Transaction, receipt: &Receipt) -> f64 {
        let mut score = 0.0;

        if transaction.amount == receipt.amount {
            score += EXACT_AMOUNT_SCORE;
        }

        score += match Self::day_difference(transaction, receipt) {
            0 => SAME_DAY_SCORE,
            1 => ONE_DAY_SCORE,
            2 => TWO_DAYS_SCORE,
            days if days <= self.config.date_tolerance_days => WITHIN_WINDOW_SCORE,
            _ => 0.0,
        };

        if self.config.use_description {
            if let Some(beneficiary) = &receipt.beneficiary {
                let similarity = jaccard_similarity(&transaction.description, beneficiary);
                if similarity >= self.config.min_description_similarity {
                    score += DESCRIPTION_SCORE;
                }
            }
        }

        if receipt.has_good_quality() {
            score += OCR_SCORE;
        }

        score.clamp(0.0, 1.0)
    }

    fn observations(&self, transaction: &Transaction, receipt: &Receipt, confidence: f64) -> String {
        let mut notes = Vec::new();

        notes.push(if confidence >= AUTO_APPROVE_CONFIDENCE {
            "High confidence - auto-approved".to_string()
        } else if confidence >= EXACT_MATCH_FLOOR {
            "Medium confidence - review".to_string()
        } else {
            "Low confidence - verify manually".to_string()
        });

        match Self::day_difference(transaction, receipt) {
            0 => notes.push("Same date".to_string()),
            1 => notes.push("Dates differ by 1 day".to_string()),
            days => notes.push(format!("Dates differ by {} days", days)),
        }

        if transaction.amount == receipt.amount {
            notes.push("Exact amount".to_string());
        } else {
            notes.push(format!(
                "Amount differs by {}",
                Self::amount_difference(transaction, receipt)
            ));
        }

        if receipt.has_good_quality() {
            notes.push(format!("Reliable OCR ({:.0}%)", receipt.ocr_confidence * 100.0));
        } else if receipt.ocr_confidence > 0.0 {
            notes.push(format!("OCR confidence {:.0}%", receipt.ocr_confidence * 100.0));
        }

        notes.push(format!("Strategy: {}", Self::NAME));
        notes.join(" | ")
    }
}

impl Default for ExactMatchStrategy {
    fn default() -> Self {
        Self {
            config: ExactMatchConfig::default(),
        }
    }
}

impl MatchingStrategy for ExactMatchStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn find_match(
        &self,
        transaction: &Transaction,
        receipts: &[Receipt],
        used: &HashSet<ReceiptId>,
    ) -> ReconResult<Option<Match>> {
        let mut best: Option<(&Receipt, f64)> = None;

        for receipt in receipts {
            if used.contains(&receipt.id) {
                continue;
            }
            if !validate_pairing(transaction, receipt) || !self.passes_gates(transaction, receipt) {
                continue;
            }

            let score = self.score(transaction, receipt);
            debug!(
                transaction = %transaction.id,
                receipt = %receipt.id,
                score,
                "Scored exact match candidate"
            );

            // strict comparison keeps the first-seen candidate on ties
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((receipt, score));
            }
        }

        match best {
            Some((receipt, score)) if score >= EXACT_MATCH_FLOOR => {
                let observations = self.observations(transaction, receipt, score);
                build_match(transaction, Some(receipt), score, MatchMethod::Exact, observations)
                    .map(Some)
            }
            Some((receipt, score)) => {
                debug!(
                    transaction = %transaction.id,
                    receipt = %receipt.id,
                    score,
                    "Best candidate below acceptance floor"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
