//! Typed rule definitions: fields, operators, predicates and actions

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::*;

/// Confidence used when a rule action does not specify one
pub const DEFAULT_RULE_CONFIDENCE: f64 = 0.85;

/// Transaction field a condition reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Description,
    Amount,
    Date,
    Type,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Description => "descricao",
            Field::Amount => "valor",
            Field::Date => "data",
            Field::Type => "tipo",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "descricao" | "descrição" | "description" => Ok(Field::Description),
            "valor" | "amount" => Ok(Field::Amount),
            "data" | "date" => Ok(Field::Date),
            "tipo" | "type" => Ok(Field::Type),
            other => Err(ReconError::Configuration(format!(
                "Unknown condition field '{}'. Valid: descricao, valor, data, tipo",
                other
            ))),
        }
    }
}

/// The ten comparison operators understood by rule conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Regex,
    GreaterThan,
    LessThan,
    Between,
    In,
    NotIn,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::Regex,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Between,
        Operator::In,
        Operator::NotIn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::Regex => "regex",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Between => "between",
            Operator::In => "in",
            Operator::NotIn => "not_in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s.trim())
            .ok_or_else(|| {
                let valid: Vec<&str> = Operator::ALL.iter().map(|op| op.as_str()).collect();
                ReconError::Configuration(format!(
                    "Invalid operator '{}'. Valid: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Scalar value written in a rule file
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(BigDecimal),
    Bool(bool),
}

impl Literal {
    /// String form used by text operators
    pub fn as_text(&self) -> String {
        match self {
            Literal::Text(text) => text.clone(),
            Literal::Number(number) => number.to_string(),
            Literal::Bool(flag) => flag.to_string(),
        }
    }

    /// Coerce into a monetary amount
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Literal::Number(number) => Some(number.clone()),
            Literal::Text(text) => BigDecimal::from_str(text.trim()).ok(),
            Literal::Bool(_) => None,
        }
    }

    /// Coerce into a date, accepting ISO (`2025-11-05`) and Brazilian
    /// (`05/11/2025`) layouts
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Literal::Text(text) => {
                let text = text.trim();
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(text, "%d/%m/%Y"))
                    .ok()
            }
            Literal::Number(_) | Literal::Bool(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// An operator together with its already-validated operand.
///
/// Each variant has exactly one evaluation routine in the rule engine.
#[derive(Debug, Clone)]
pub enum Predicate {
    Equals(Literal),
    NotEquals(Literal),
    /// True if any of the needles is a substring
    Contains(Vec<String>),
    NotContains(Vec<String>),
    /// Compiled case-insensitive pattern
    Regex(Regex),
    GreaterThan(Literal),
    LessThan(Literal),
    /// Inclusive `[min, max]`
    Between(Literal, Literal),
    In(Vec<Literal>),
    NotIn(Vec<Literal>),
}

impl Predicate {
    pub fn operator(&self) -> Operator {
        match self {
            Predicate::Equals(_) => Operator::Equals,
            Predicate::NotEquals(_) => Operator::NotEquals,
            Predicate::Contains(_) => Operator::Contains,
            Predicate::NotContains(_) => Operator::NotContains,
            Predicate::Regex(_) => Operator::Regex,
            Predicate::GreaterThan(_) => Operator::GreaterThan,
            Predicate::LessThan(_) => Operator::LessThan,
            Predicate::Between(_, _) => Operator::Between,
            Predicate::In(_) => Operator::In,
            Predicate::NotIn(_) => Operator::NotIn,
        }
    }
}

/// One test against a transaction field
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: Field,
    pub predicate: Predicate,
}

impl Condition {
    pub fn new(field: Field, predicate: Predicate) -> Self {
        Self { field, predicate }
    }

    pub fn operator(&self) -> Operator {
        self.predicate.operator()
    }
}

/// What a rule does when all of its conditions hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "auto_aprovar")]
    AutoApprove,
    #[serde(rename = "sugerir")]
    Suggest,
    #[serde(rename = "ignorar")]
    Ignore,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::AutoApprove, ActionKind::Suggest, ActionKind::Ignore];

    /// Name used in rule files
    pub fn code(&self) -> &'static str {
        match self {
            ActionKind::AutoApprove => "auto_aprovar",
            ActionKind::Suggest => "sugerir",
            ActionKind::Ignore => "ignorar",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ActionKind {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto_aprovar" | "auto_approve" => Ok(ActionKind::AutoApprove),
            "sugerir" | "suggest" => Ok(ActionKind::Suggest),
            "ignorar" | "ignore" => Ok(ActionKind::Ignore),
            other => {
                let valid: Vec<&str> = ActionKind::ALL.iter().map(|k| k.code()).collect();
                Err(ReconError::Configuration(format!(
                    "Invalid action type '{}'. Valid: {}",
                    other,
                    valid.join(", ")
                )))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionKind,
    /// Confidence of the produced match, in [0, 1]
    pub confidence: f64,
    pub observation: Option<String>,
    pub category: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            confidence: DEFAULT_RULE_CONFIDENCE,
            observation: None,
            category: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_observation(mut self, observation: impl Into<String>) -> Self {
        self.observation = Some(observation.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A validated auto-reconciliation rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Higher runs first
    pub priority: i32,
    pub active: bool,
    /// All must hold (logical AND)
    pub conditions: Vec<Condition>,
    pub action: Action,
}

impl Rule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            priority: 0,
            active: true,
            conditions: Vec::new(),
            action,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, field: Field, predicate: Predicate) -> Self {
        self.conditions.push(Condition::new(field, predicate));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
