//! Reconciliation orchestrator that drives the strategy cascade

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::reconciliation::report::{render_report, ReportFormat};
use crate::reconciliation::statistics::ReconciliationStatistics;
use crate::traits::*;
use crate::types::*;

/// A strategy error isolated by the cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub transaction_id: TransactionId,
    pub strategy: String,
    pub message: String,
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Accepted matches, in transaction order
    pub matches: Vec<Match>,
    pub failures: Vec<StrategyFailure>,
    /// Accepted matches per strategy label, see
    /// [`ReconciliationEngine::strategy_labels`]
    pub matches_by_strategy: BTreeMap<String, usize>,
    pub elapsed_ms: u128,
}

/// Throughput counters accumulated across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_runs: u64,
    pub total_time_secs: f64,
    pub mean_time_secs: f64,
}

/// Owns an ordered list of strategies and runs them in cascade over a
/// statement, never using a receipt twice within a run
pub struct ReconciliationEngine {
    strategies: Vec<Box<dyn MatchingStrategy>>,
    config: EngineConfig,
    total_runs: u64,
    total_elapsed: Duration,
}

impl ReconciliationEngine {
    /// Create an engine with the given strategies and configuration.
    ///
    /// Strategies are ordered by descending priority; equal priorities keep
    /// the order they were passed in.
    pub fn new(
        strategies: Vec<Box<dyn MatchingStrategy>>,
        config: EngineConfig,
    ) -> ReconResult<Self> {
        config.validate()?;

        let mut engine = Self {
            strategies,
            config,
            total_runs: 0,
            total_elapsed: Duration::ZERO,
        };
        engine.sort_strategies();

        info!(
            strategies = ?engine.strategy_names(),
            min_confidence = engine.config.min_confidence,
            "Reconciliation engine initialised"
        );
        Ok(engine)
    }

    fn sort_strategies(&mut self) {
        self.strategies
            .sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Register another strategy and restore cascade order
    pub fn add_strategy(&mut self, strategy: Box<dyn MatchingStrategy>) {
        info!(strategy = strategy.name(), priority = strategy.priority(), "Strategy added");
        self.strategies.push(strategy);
        self.sort_strategies();
    }

    /// Strategy names in cascade order
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Strategy names in cascade order, made unique: a name seen before
    /// gets its occurrence number appended (`"Rule Based #2"`)
    pub fn strategy_labels(&self) -> Vec<String> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        self.strategies
            .iter()
            .map(|s| {
                let count = seen.entry(s.name()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    s.name().to_string()
                } else {
                    format!("{} #{}", s.name(), count)
                }
            })
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the cascade and return only the accepted matches
    pub fn reconcile(
        &mut self,
        transactions: &[Transaction],
        receipts: &[Receipt],
    ) -> ReconResult<Vec<Match>> {
        Ok(self.reconcile_detailed(transactions, receipts)?.matches)
    }

    /// Run the cascade over every transaction, in input order.
    ///
    /// For each transaction the first strategy returning a match at or above
    /// `min_confidence` wins. Strategy errors are recorded and the cascade
    /// moves on to the next strategy.
    #[instrument(skip_all, fields(transactions = transactions.len(), receipts = receipts.len()))]
    pub fn reconcile_detailed(
        &mut self,
        transactions: &[Transaction],
        receipts: &[Receipt],
    ) -> ReconResult<RunOutcome> {
        if transactions.is_empty() {
            return Err(ReconError::InvalidInput(
                "No transactions to reconcile".to_string(),
            ));
        }
        if self.strategies.is_empty() {
            return Err(ReconError::InvalidInput(
                "No matching strategies registered".to_string(),
            ));
        }

        let started = Instant::now();
        let mut used: HashSet<ReceiptId> = HashSet::new();
        let mut matches = Vec::new();
        let mut failures = Vec::new();
        let mut matches_by_strategy: BTreeMap<String, usize> = BTreeMap::new();

        info!("Starting reconciliation run");

        let labels = self.strategy_labels();

        for transaction in transactions {
            for (strategy, label) in self.strategies.iter().zip(&labels) {
                let candidate = match strategy.find_match(transaction, receipts, &used) {
                    Ok(candidate) => candidate,
                    Err(e) => {
                        warn!(
                            strategy = strategy.name(),
                            transaction = %transaction.id,
                            error = %e,
                            "Strategy failed, trying next"
                        );
                        failures.push(StrategyFailure {
                            transaction_id: transaction.id,
                            strategy: strategy.name().to_string(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                let m = match candidate {
                    Some(m) => m,
                    None => continue,
                };

                if m.confidence < self.config.min_confidence {
                    debug!(
                        strategy = strategy.name(),
                        transaction = %transaction.id,
                        confidence = m.confidence,
                        "Match below minimum confidence, ignored"
                    );
                    continue;
                }

                if let Some(receipt_id) = m.receipt_id {
                    if used.contains(&receipt_id) {
                        warn!(
                            strategy = strategy.name(),
                            transaction = %transaction.id,
                            receipt = %receipt_id,
                            "Strategy returned an already used receipt, trying next"
                        );
                        failures.push(StrategyFailure {
                            transaction_id: transaction.id,
                            strategy: strategy.name().to_string(),
                            message: format!("Receipt {} already used in this run", receipt_id),
                        });
                        continue;
                    }
                    used.insert(receipt_id);
                }
                info!(
                    strategy = strategy.name(),
                    transaction = %transaction.id,
                    description = %transaction.description,
                    confidence = m.confidence,
                    "Match accepted"
                );
                *matches_by_strategy.entry(label.clone()).or_insert(0) += 1;
                matches.push(m);
                break;
            }
        }

        let elapsed = started.elapsed();
        self.total_runs += 1;
        self.total_elapsed += elapsed;

        info!(
            matches = matches.len(),
            unmatched = transactions.len() - matches.len(),
            failures = failures.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Reconciliation run finished"
        );

        Ok(RunOutcome {
            matches,
            failures,
            matches_by_strategy,
            elapsed_ms: elapsed.as_millis(),
        })
    }

    /// Reconcile only the transactions and receipts accepted by the filters
    pub fn reconcile_filtered(
        &mut self,
        transactions: &[Transaction],
        receipts: &[Receipt],
        transaction_filter: Option<&dyn Fn(&Transaction) -> bool>,
        receipt_filter: Option<&dyn Fn(&Receipt) -> bool>,
    ) -> ReconResult<Vec<Match>> {
        let transactions: Vec<Transaction> = match transaction_filter {
            Some(keep) => transactions.iter().filter(|t| keep(t)).cloned().collect(),
            None => transactions.to_vec(),
        };
        let receipts: Vec<Receipt> = match receipt_filter {
            Some(keep) => receipts.iter().filter(|r| keep(r)).cloned().collect(),
            None => receipts.to_vec(),
        };

        debug!(
            transactions = transactions.len(),
            receipts = receipts.len(),
            "Filters applied"
        );
        self.reconcile(&transactions, &receipts)
    }

    /// Pull inputs from the collaborators, run the cascade and store the
    /// resulting matches
    pub async fn reconcile_sources<T, R, M>(
        &mut self,
        statements: &T,
        receipt_source: &R,
        store: &mut M,
    ) -> ReconResult<RunOutcome>
    where
        T: StatementSource + ?Sized,
        R: ReceiptSource + ?Sized,
        M: MatchStore + ?Sized,
    {
        let transactions = statements.load_transactions().await?;
        let receipts = receipt_source.load_receipts().await?;

        let outcome = self.reconcile_detailed(&transactions, &receipts)?;
        store.save_matches(&outcome.matches).await?;

        Ok(outcome)
    }

    /// Statistics of a completed run using this engine's auto-approve threshold
    pub fn statistics(
        &self,
        matches: &[Match],
        transactions: &[Transaction],
    ) -> ReconciliationStatistics {
        ReconciliationStatistics::compute(matches, transactions, self.config.auto_approve_threshold)
    }

    /// Matches over transactions, 0 when there are no transactions
    pub fn reconciliation_rate(&self, matches: &[Match], transactions: &[Transaction]) -> f64 {
        if transactions.is_empty() {
            return 0.0;
        }
        matches.len() as f64 / transactions.len() as f64
    }

    pub fn report(
        &self,
        matches: &[Match],
        transactions: &[Transaction],
        format: ReportFormat,
    ) -> String {
        render_report(&self.statistics(matches, transactions), format)
    }

    pub fn performance(&self) -> PerformanceMetrics {
        let total_time_secs = self.total_elapsed.as_secs_f64();
        let mean_time_secs = if self.total_runs == 0 {
            0.0
        } else {
            total_time_secs / self.total_runs as f64
        };

        PerformanceMetrics {
            total_runs: self.total_runs,
            total_time_secs,
            mean_time_secs,
        }
    }
}
