//! Engine and strategy configuration, loadable from YAML

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::reconciliation::ReconciliationEngine;
use crate::strategies::{ExactMatchStrategy, RuleBasedStrategy};
use crate::traits::MatchingStrategy;
use crate::types::*;

/// Widest date window a strategy may be configured with, in days
pub const MAX_DATE_TOLERANCE_DAYS: i64 = 10;

fn default_min_confidence() -> f64 {
    0.60
}

fn default_auto_approve_threshold() -> f64 {
    AUTO_APPROVE_CONFIDENCE
}

fn default_date_tolerance_days() -> i64 {
    3
}

fn default_amount_tolerance() -> BigDecimal {
    BigDecimal::from(0)
}

fn default_min_description_similarity() -> f64 {
    0.7
}

/// Orchestrator thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Matches below this confidence are discarded
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Matches at or above this confidence need no review
    #[serde(default = "default_auto_approve_threshold")]
    pub auto_approve_threshold: f64,
    /// Date window used by `exact_match` when its settings omit one
    #[serde(default = "default_date_tolerance_days")]
    pub date_tolerance_days: i64,
    /// Amount tolerance used by `exact_match` when its settings omit one
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: BigDecimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            auto_approve_threshold: default_auto_approve_threshold(),
            date_tolerance_days: default_date_tolerance_days(),
            amount_tolerance: default_amount_tolerance(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ReconResult<()> {
        check_unit_interval(self.min_confidence, "min_confidence")?;
        check_unit_interval(self.auto_approve_threshold, "auto_approve_threshold")?;

        if self.min_confidence > self.auto_approve_threshold {
            return Err(ReconError::Configuration(format!(
                "min_confidence ({}) must not exceed auto_approve_threshold ({})",
                self.min_confidence, self.auto_approve_threshold
            )));
        }

        check_date_tolerance(self.date_tolerance_days)?;
        check_amount_tolerance(&self.amount_tolerance)
    }
}

/// Parameters of the exact-match strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactMatchConfig {
    /// Maximum distance in days between transaction and receipt
    #[serde(default = "default_date_tolerance_days")]
    pub date_tolerance_days: i64,
    /// Maximum absolute amount difference, zero for exact amounts
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: BigDecimal,
    /// Score description against beneficiary similarity
    #[serde(default)]
    pub use_description: bool,
    #[serde(default = "default_min_description_similarity")]
    pub min_description_similarity: f64,
}

impl Default for ExactMatchConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: default_date_tolerance_days(),
            amount_tolerance: default_amount_tolerance(),
            use_description: false,
            min_description_similarity: default_min_description_similarity(),
        }
    }
}

impl ExactMatchConfig {
    pub fn validate(&self) -> ReconResult<()> {
        check_date_tolerance(self.date_tolerance_days)?;
        check_amount_tolerance(&self.amount_tolerance)?;
        check_unit_interval(self.min_description_similarity, "min_description_similarity")
    }
}

pub(crate) fn check_date_tolerance(days: i64) -> ReconResult<()> {
    if !(0..=MAX_DATE_TOLERANCE_DAYS).contains(&days) {
        return Err(ReconError::Configuration(format!(
            "date_tolerance_days must be between 0 and {}, got {}",
            MAX_DATE_TOLERANCE_DAYS, days
        )));
    }
    Ok(())
}

pub(crate) fn check_amount_tolerance(tolerance: &BigDecimal) -> ReconResult<()> {
    if *tolerance < BigDecimal::from(0) {
        return Err(ReconError::Configuration(format!(
            "amount_tolerance must be non-negative, got {}",
            tolerance
        )));
    }
    Ok(())
}

fn check_unit_interval(value: f64, what: &str) -> ReconResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ReconError::Configuration(format!(
            "{} must be between 0 and 1, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Complete settings document for building an engine
///
/// ```yaml
/// engine:
///   min_confidence: 0.6
///   auto_approve_threshold: 0.9
///   date_tolerance_days: 3
/// exact_match:
///   use_description: true
/// rules_file: regras.yaml
/// ```
///
/// Tolerances missing from `exact_match` are taken from `engine`. A
/// relative `rules_file` read through [`ReconcilerSettings::from_file`] is
/// resolved against the settings file's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSettings")]
pub struct ReconcilerSettings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub exact_match: ExactMatchConfig,
    /// Rule file for the rule-based strategy; no rule strategy when absent
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawExactMatch {
    date_tolerance_days: Option<i64>,
    amount_tolerance: Option<BigDecimal>,
    #[serde(default)]
    use_description: bool,
    #[serde(default = "default_min_description_similarity")]
    min_description_similarity: f64,
}

#[derive(Deserialize)]
struct RawSettings {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    exact_match: Option<RawExactMatch>,
    #[serde(default)]
    rules_file: Option<PathBuf>,
}

impl From<RawSettings> for ReconcilerSettings {
    fn from(raw: RawSettings) -> Self {
        let exact_match = match raw.exact_match {
            Some(exact) => ExactMatchConfig {
                date_tolerance_days: exact
                    .date_tolerance_days
                    .unwrap_or(raw.engine.date_tolerance_days),
                amount_tolerance: exact
                    .amount_tolerance
                    .unwrap_or_else(|| raw.engine.amount_tolerance.clone()),
                use_description: exact.use_description,
                min_description_similarity: exact.min_description_similarity,
            },
            None => ExactMatchConfig {
                date_tolerance_days: raw.engine.date_tolerance_days,
                amount_tolerance: raw.engine.amount_tolerance.clone(),
                ..ExactMatchConfig::default()
            },
        };

        Self {
            engine: raw.engine,
            exact_match,
            rules_file: raw.rules_file,
        }
    }
}

impl ReconcilerSettings {
    /// Parse and validate a YAML settings document
    pub fn from_yaml_str(content: &str) -> ReconResult<Self> {
        let settings: ReconcilerSettings = if content.trim().is_empty() {
            ReconcilerSettings::default()
        } else {
            serde_yaml::from_str(content)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Read a settings file; a relative `rules_file` is taken relative to
    /// the directory holding `path`
    pub fn from_file(path: impl AsRef<Path>) -> ReconResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut settings = Self::from_yaml_str(&content)?;

        let resolved = match (&settings.rules_file, path.parent()) {
            (Some(rules), Some(dir)) if rules.is_relative() => Some(dir.join(rules)),
            _ => None,
        };
        if resolved.is_some() {
            settings.rules_file = resolved;
        }
        Ok(settings)
    }

    pub fn validate(&self) -> ReconResult<()> {
        self.engine.validate()?;
        self.exact_match.validate()
    }

    /// Compose the strategies described by these settings and inject them
    /// into a new engine
    pub fn build_engine(&self) -> ReconResult<ReconciliationEngine> {
        let mut strategies: Vec<Box<dyn MatchingStrategy>> = Vec::new();

        if let Some(path) = &self.rules_file {
            strategies.push(Box::new(RuleBasedStrategy::from_file(path)));
        }
        strategies.push(Box::new(ExactMatchStrategy::new(self.exact_match.clone())?));

        info!(strategies = strategies.len(), "Building reconciliation engine");
        ReconciliationEngine::new(strategies, self.engine.clone())
    }
}
