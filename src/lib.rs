//! # Reconciliation Core
//!
//! Matches bank statement transactions against payment receipts,
//! auto-approving high-confidence pairings and flagging the rest for review.
//!
//! ## Features
//!
//! - **Strategy cascade**: pluggable matching strategies tried in descending priority
//! - **Exact matching**: amount equality plus date proximity scoring against receipts
//! - **Rule DSL**: YAML rules with ten operators for receipt-less auto-reconciliation
//! - **Single use**: a receipt is never matched twice within a run
//! - **Statistics and reports**: rates, confidence bands, plain-text and markdown summaries
//! - **Collaborator abstraction**: async traits for statement, receipt and match storage
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{
//!     EngineConfig, ExactMatchStrategy, MatchingStrategy, Receipt, ReconciliationEngine,
//!     Transaction, TransactionType,
//! };
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
//! let transactions = vec![
//!     Transaction::new(date, BigDecimal::from(150), "PAGTO FORNECEDOR", TransactionType::Debit).unwrap(),
//! ];
//! let receipts = vec![Receipt::new("nf_001.pdf", date, BigDecimal::from(150)).unwrap()];
//!
//! let strategies: Vec<Box<dyn MatchingStrategy>> = vec![Box::new(ExactMatchStrategy::default())];
//! let mut engine = ReconciliationEngine::new(strategies, EngineConfig::default()).unwrap();
//!
//! let matches = engine.reconcile(&transactions, &receipts).unwrap();
//! assert_eq!(matches.len(), 1);
//! ```

pub mod config;
pub mod reconciliation;
pub mod rules;
pub mod strategies;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use reconciliation::{
    format_currency, render_report, ConfidenceBuckets, PerformanceMetrics,
    ReconciliationEngine, ReconciliationStatistics, ReportFormat, RunOutcome, StrategyFailure,
};
pub use rules::{
    Action, ActionKind, Condition, Field, Literal, Operator, Predicate, Rule, RuleEngine,
    RuleLoader, RuleSetSummary,
};
pub use strategies::{ExactMatchStrategy, RuleBasedStrategy, RuleStrategySummary};
pub use traits::*;
pub use types::*;
