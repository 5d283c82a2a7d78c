//! Rule-based strategy: auto-reconciles recurring items without a receipt

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::rules::{Rule, RuleEngine, RuleLoader, RuleSetSummary};
use crate::traits::MatchingStrategy;
use crate::types::*;

/// Status report of a rule-based strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStrategySummary {
    pub name: String,
    pub priority: i32,
    pub rules_file: Option<PathBuf>,
    /// `"active"` when rules are loaded, `"inactive"` otherwise
    pub status: String,
    pub rules: RuleSetSummary,
}

/// Delegates to the rule engine and never consumes receipts.
///
/// Runs ahead of receipt-based strategies so that fees, taxes and other
/// clearly classifiable items never reach the receipt pool.
#[derive(Debug, Clone)]
pub struct RuleBasedStrategy {
    name: String,
    priority: i32,
    rules_file: Option<PathBuf>,
    engine: RuleEngine,
}

impl RuleBasedStrategy {
    pub const NAME: &'static str = "Rule Based";
    pub const PRIORITY: i32 = 20;

    /// Strategy over an in-memory rule list
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self {
            name: Self::NAME.to_string(),
            priority: Self::PRIORITY,
            rules_file: None,
            engine: RuleEngine::new(rules),
        }
    }

    /// Strategy over a rule file; load failures leave it with no rules
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut strategy = Self::from_rules(Vec::new());
        strategy.rules_file = Some(path);
        strategy.reload_rules();
        strategy
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn rule_engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Re-read the rule file, returning the number of active rules.
    ///
    /// An invalid file empties the rule set instead of failing.
    pub fn reload_rules(&mut self) -> usize {
        let path = match &self.rules_file {
            Some(path) => path.clone(),
            None => return self.engine.len(),
        };

        let rules = match RuleLoader::new(&path).load() {
            Ok(rules) => rules,
            Err(e) => {
                error!(
                    file = %path.display(),
                    error = %e,
                    "Failed to load rules, rule-based matching disabled"
                );
                Vec::new()
            }
        };

        self.engine = RuleEngine::new(rules);
        info!(file = %path.display(), rules = self.engine.len(), "Rules loaded");
        self.engine.len()
    }

    pub fn summary(&self) -> RuleStrategySummary {
        RuleStrategySummary {
            name: self.name.clone(),
            priority: self.priority,
            rules_file: self.rules_file.clone(),
            status: if self.engine.is_empty() { "inactive" } else { "active" }.to_string(),
            rules: self.engine.summary(),
        }
    }
}

impl MatchingStrategy for RuleBasedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn find_match(
        &self,
        transaction: &Transaction,
        _receipts: &[Receipt],
        _used: &HashSet<ReceiptId>,
    ) -> ReconResult<Option<Match>> {
        if self.engine.is_empty() {
            return Ok(None);
        }
        self.engine.evaluate(transaction)
    }
}
