//! Condition evaluator: applies validated rules to transactions in cascade

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info, warn};

use crate::rules::definition::*;
use crate::types::*;

/// Field value extracted from a transaction for comparison
#[derive(Debug, Clone, Copy)]
enum FieldValue<'a> {
    Text(&'a str),
    Amount(&'a BigDecimal),
    Date(NaiveDate),
}

impl FieldValue<'_> {
    fn render(&self) -> String {
        match self {
            FieldValue::Text(text) => text.to_string(),
            FieldValue::Amount(amount) => amount.to_string(),
            FieldValue::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

fn field_value(field: Field, transaction: &Transaction) -> FieldValue<'_> {
    match field {
        Field::Description => FieldValue::Text(&transaction.description),
        Field::Amount => FieldValue::Amount(&transaction.amount),
        Field::Date => FieldValue::Date(transaction.date),
        Field::Type => FieldValue::Text(transaction.transaction_type.code()),
    }
}

/// Compare a field against a literal coerced into the field's type.
///
/// `None` means the literal could not be coerced.
fn compare(value: &FieldValue<'_>, literal: &Literal) -> Option<Ordering> {
    match value {
        FieldValue::Text(text) => Some(
            text.to_lowercase()
                .cmp(&literal.as_text().to_lowercase()),
        ),
        FieldValue::Amount(amount) => {
            let expected = literal.to_decimal()?;
            Some(BigDecimal::cmp(amount, &expected))
        }
        FieldValue::Date(date) => {
            let expected = literal.to_date()?;
            Some(date.cmp(&expected))
        }
    }
}

fn compare_logged(value: &FieldValue<'_>, literal: &Literal, operator: Operator) -> Option<Ordering> {
    let ordering = compare(value, literal);
    if ordering.is_none() {
        warn!(
            operator = %operator,
            value = %value.render(),
            literal = %literal,
            "Rule literal cannot be coerced to the field type, condition fails"
        );
    }
    ordering
}

fn contains_any(value: &FieldValue<'_>, needles: &[String]) -> bool {
    let haystack = value.render().to_uppercase();
    needles
        .iter()
        .any(|needle| haystack.contains(&needle.to_uppercase()))
}

fn is_member(value: &FieldValue<'_>, members: &[Literal]) -> bool {
    members
        .iter()
        .any(|member| compare(value, member) == Some(Ordering::Equal))
}

/// Evaluate one condition against a transaction
pub fn evaluate_condition(condition: &Condition, transaction: &Transaction) -> bool {
    let value = field_value(condition.field, transaction);
    let operator = condition.operator();

    match &condition.predicate {
        Predicate::Equals(expected) => {
            compare_logged(&value, expected, operator) == Some(Ordering::Equal)
        }
        Predicate::NotEquals(expected) => matches!(
            compare_logged(&value, expected, operator),
            Some(Ordering::Less | Ordering::Greater)
        ),
        Predicate::Contains(needles) => contains_any(&value, needles),
        Predicate::NotContains(needles) => !contains_any(&value, needles),
        Predicate::Regex(pattern) => pattern.is_match(&value.render()),
        Predicate::GreaterThan(bound) => {
            compare_logged(&value, bound, operator) == Some(Ordering::Greater)
        }
        Predicate::LessThan(bound) => {
            compare_logged(&value, bound, operator) == Some(Ordering::Less)
        }
        Predicate::Between(min, max) => {
            let above_min = matches!(
                compare_logged(&value, min, operator),
                Some(Ordering::Greater | Ordering::Equal)
            );
            let below_max = matches!(
                compare_logged(&value, max, operator),
                Some(Ordering::Less | Ordering::Equal)
            );
            above_min && below_max
        }
        Predicate::In(members) => is_member(&value, members),
        Predicate::NotIn(members) => !is_member(&value, members),
    }
}

/// Whether every condition of the rule holds (logical AND)
pub fn rule_matches(rule: &Rule, transaction: &Transaction) -> bool {
    rule.conditions
        .iter()
        .all(|condition| evaluate_condition(condition, transaction))
}

/// Overview of a loaded rule set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSummary {
    pub total_rules: usize,
    /// Rule id and priority, in evaluation order
    pub priorities: Vec<(String, i32)>,
    /// Rule id and action kind, in evaluation order
    pub action_kinds: Vec<(String, ActionKind)>,
}

/// Applies rules in descending priority order and stops at the first rule
/// whose conditions all hold
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    /// Create an engine; rules are ordered by descending priority, ties keep
    /// their original order
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        info!(rules = rules.len(), "Rule engine initialised");
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule satisfied by the transaction, if any
    pub fn first_match(&self, transaction: &Transaction) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|rule| rule_matches(rule, transaction))
    }

    /// Produce a receipt-less match from the first satisfied rule
    pub fn evaluate(&self, transaction: &Transaction) -> ReconResult<Option<Match>> {
        let rule = match self.first_match(transaction) {
            Some(rule) => rule,
            None => return Ok(None),
        };

        info!(
            rule = %rule.id,
            description = %transaction.description,
            "Rule applied to transaction"
        );

        let m = Match::new(
            transaction.id,
            None,
            rule.action.confidence,
            MatchMethod::Rule,
            Some(observations_for(rule)),
        )?;
        debug!(rule = %rule.id, confidence = m.confidence, "Rule match created");

        Ok(Some(m))
    }

    pub fn summary(&self) -> RuleSetSummary {
        RuleSetSummary {
            total_rules: self.rules.len(),
            priorities: self
                .rules
                .iter()
                .map(|rule| (rule.id.clone(), rule.priority))
                .collect(),
            action_kinds: self
                .rules
                .iter()
                .map(|rule| (rule.id.clone(), rule.action.kind))
                .collect(),
        }
    }
}

fn observations_for(rule: &Rule) -> String {
    let base = rule
        .action
        .observation
        .clone()
        .unwrap_or_else(|| format!("Auto-reconciled by rule: {}", rule.name));

    let mut text = format!("{} | Rule: {}", base, rule.id);
    if let Some(category) = &rule.action.category {
        text.push_str(&format!(" | Category: {}", category));
    }
    text
}
