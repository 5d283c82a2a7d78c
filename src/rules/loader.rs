//! Rule definition loading and structural validation
//!
//! Rule files are YAML documents with a top-level `regras` list:
//!
//! ```yaml
//! regras:
//!   - id: tarifa_doc
//!     nome: "Bank fee"
//!     prioridade: 10
//!     ativo: true
//!     condicoes:
//!       - campo: descricao
//!         operador: contains
//!         valor: ["TARIFA", "TAR "]
//!       - campo: tipo
//!         operador: equals
//!         valor: D
//!     acao:
//!       tipo: auto_aprovar
//!       confianca: 0.95
//!       observacao: "Bank fee"
//!       categoria: "Bank fees"
//! ```

use bigdecimal::BigDecimal;
use regex::RegexBuilder;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::rules::definition::*;
use crate::types::*;
use crate::utils::validation::validate_unit_interval;

#[derive(Debug, Deserialize)]
struct RawRuleSet {
    #[serde(default, alias = "rules")]
    regras: Option<Vec<RawRule>>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    id: Option<Value>,
    #[serde(alias = "name")]
    nome: Option<String>,
    #[serde(alias = "description")]
    descricao: Option<String>,
    #[serde(alias = "priority")]
    prioridade: Option<i32>,
    #[serde(alias = "active")]
    ativo: Option<bool>,
    #[serde(alias = "conditions")]
    condicoes: Option<Value>,
    #[serde(alias = "action")]
    acao: Option<Value>,
}

/// Reads and validates rule definitions
#[derive(Debug, Clone)]
pub struct RuleLoader {
    path: PathBuf,
}

impl RuleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the active rules of the file.
    ///
    /// A missing file yields an empty rule set. A malformed document or one
    /// violating the structural invariants is an error.
    pub fn load(&self) -> ReconResult<Vec<Rule>> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "Rule file not found, continuing without rules");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let rules = Self::parse_str(&content)?;

        info!(
            path = %self.path.display(),
            active_rules = rules.len(),
            "Rules loaded"
        );
        Ok(rules)
    }

    /// Parse and validate a rule document, returning only the active rules
    pub fn parse_str(content: &str) -> ReconResult<Vec<Rule>> {
        if content.trim().is_empty() {
            warn!("Rule document is empty");
            return Ok(Vec::new());
        }

        let document: Value = serde_yaml::from_str(content)?;
        if document.is_null() {
            warn!("Rule document is empty");
            return Ok(Vec::new());
        }

        let raw: RawRuleSet = serde_yaml::from_value(document)?;
        let raw_rules = match raw.regras {
            Some(rules) if !rules.is_empty() => rules,
            _ => {
                warn!("No rules found in document");
                return Ok(Vec::new());
            }
        };

        let total = raw_rules.len();
        let mut seen_ids = HashSet::new();
        let mut rules = Vec::with_capacity(total);

        for (index, raw_rule) in raw_rules.into_iter().enumerate() {
            let rule = parse_rule(index, raw_rule)?;
            if !seen_ids.insert(rule.id.clone()) {
                return Err(ReconError::Configuration(format!(
                    "Duplicate rule id '{}'",
                    rule.id
                )));
            }
            rules.push(rule);
        }

        let active: Vec<Rule> = rules.into_iter().filter(|rule| rule.active).collect();
        debug!(total, active = active.len(), "Rules validated");

        Ok(active)
    }
}

fn parse_rule(index: usize, raw: RawRule) -> ReconResult<Rule> {
    let id = required_text(rule_id(index, raw.id)?, || {
        format!("Rule #{} is missing required field 'id'", index)
    })?;
    let name = required_text(raw.nome, || {
        format!("Rule '{}' is missing required field 'nome'", id)
    })?;

    let conditions = match raw.condicoes {
        None | Some(Value::Null) => {
            return Err(ReconError::Configuration(format!(
                "Rule '{}' is missing required field 'condicoes'",
                id
            )))
        }
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            return Err(ReconError::Configuration(format!(
                "Rule '{}': 'condicoes' must be a list",
                id
            )))
        }
    };

    if conditions.is_empty() {
        return Err(ReconError::Configuration(format!(
            "Rule '{}': 'condicoes' cannot be empty",
            id
        )));
    }

    let conditions = conditions
        .iter()
        .enumerate()
        .map(|(position, value)| parse_condition(&id, position, value))
        .collect::<ReconResult<Vec<_>>>()?;

    let action = match raw.acao {
        None | Some(Value::Null) => {
            return Err(ReconError::Configuration(format!(
                "Rule '{}' is missing required field 'acao'",
                id
            )))
        }
        Some(value) => parse_action(&id, &value)?,
    };

    Ok(Rule {
        id,
        name,
        description: raw.descricao,
        priority: raw.prioridade.unwrap_or(0),
        active: raw.ativo.unwrap_or(true),
        conditions,
        action,
    })
}

/// Ids written as plain numbers or booleans are kept as their text
fn rule_id(index: usize, value: Option<Value>) -> ReconResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Bool(flag)) => Ok(Some(flag.to_string())),
        Some(_) => Err(ReconError::Configuration(format!(
            "Rule #{}: 'id' must be a scalar",
            index
        ))),
    }
}

fn required_text(value: Option<String>, message: impl FnOnce() -> String) -> ReconResult<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(ReconError::Configuration(message())),
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key))
}

fn parse_condition(rule_id: &str, position: usize, value: &Value) -> ReconResult<Condition> {
    let context = || format!("Rule '{}', condition #{}", rule_id, position);

    if !value.is_mapping() {
        return Err(ReconError::Configuration(format!(
            "{}: condition must be a mapping",
            context()
        )));
    }

    let field = lookup(value, &["campo", "field"])
        .and_then(Value::as_str)
        .ok_or_else(|| ReconError::Configuration(format!("{}: missing field 'campo'", context())))?;
    let operator = lookup(value, &["operador", "operator"])
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ReconError::Configuration(format!("{}: missing field 'operador'", context()))
        })?;
    let operand = lookup(value, &["valor", "value"])
        .ok_or_else(|| ReconError::Configuration(format!("{}: missing field 'valor'", context())))?;

    let field = Field::from_str(field)
        .map_err(|e| ReconError::Configuration(format!("{}: {}", context(), inner(e))))?;
    let operator = Operator::from_str(operator)
        .map_err(|e| ReconError::Configuration(format!("{}: {}", context(), inner(e))))?;
    let predicate = build_predicate(operator, operand)
        .map_err(|message| ReconError::Configuration(format!("{}: {}", context(), message)))?;

    Ok(Condition::new(field, predicate))
}

fn inner(error: ReconError) -> String {
    match error {
        ReconError::Configuration(message) => message,
        other => other.to_string(),
    }
}

fn build_predicate(operator: Operator, operand: &Value) -> Result<Predicate, String> {
    let predicate = match operator {
        Operator::Equals => Predicate::Equals(scalar(operator, operand)?),
        Operator::NotEquals => Predicate::NotEquals(scalar(operator, operand)?),
        Operator::GreaterThan => Predicate::GreaterThan(scalar(operator, operand)?),
        Operator::LessThan => Predicate::LessThan(scalar(operator, operand)?),
        Operator::Contains => Predicate::Contains(needles(operator, operand)?),
        Operator::NotContains => Predicate::NotContains(needles(operator, operand)?),
        Operator::Regex => {
            let pattern = scalar(operator, operand)?.as_text();
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| format!("invalid regex '{}': {}", pattern, e))?;
            Predicate::Regex(regex)
        }
        Operator::Between => {
            let bounds = match operand {
                Value::Sequence(items) if items.len() == 2 => items,
                _ => return Err("'between' requires a two-element [min, max] list".to_string()),
            };
            Predicate::Between(scalar(operator, &bounds[0])?, scalar(operator, &bounds[1])?)
        }
        Operator::In => Predicate::In(members(operator, operand)?),
        Operator::NotIn => Predicate::NotIn(members(operator, operand)?),
    };
    Ok(predicate)
}

fn literal(value: &Value) -> Option<Literal> {
    match value {
        Value::String(text) => Some(Literal::Text(text.clone())),
        Value::Bool(flag) => Some(Literal::Bool(*flag)),
        Value::Number(number) => BigDecimal::from_str(&number.to_string())
            .ok()
            .map(Literal::Number),
        _ => None,
    }
}

fn scalar(operator: Operator, value: &Value) -> Result<Literal, String> {
    literal(value).ok_or_else(|| format!("'{}' requires a scalar value", operator))
}

fn needles(operator: Operator, value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar(operator, item).map(|lit| lit.as_text()))
            .collect(),
        other => Ok(vec![scalar(operator, other)?.as_text()]),
    }
}

fn members(operator: Operator, value: &Value) -> Result<Vec<Literal>, String> {
    match value {
        Value::Sequence(items) => items.iter().map(|item| scalar(operator, item)).collect(),
        other => Ok(vec![scalar(operator, other)?]),
    }
}

fn parse_action(rule_id: &str, value: &Value) -> ReconResult<Action> {
    if !value.is_mapping() {
        return Err(ReconError::Configuration(format!(
            "Rule '{}': 'acao' must be a mapping",
            rule_id
        )));
    }

    let kind = lookup(value, &["tipo", "type"])
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ReconError::Configuration(format!("Rule '{}': 'acao' must have field 'tipo'", rule_id))
        })?;
    let kind = ActionKind::from_str(kind)
        .map_err(|e| ReconError::Configuration(format!("Rule '{}': {}", rule_id, inner(e))))?;

    let mut action = Action::new(kind);

    if let Some(confidence) = lookup(value, &["confianca", "confidence"]) {
        let confidence = confidence.as_f64().ok_or_else(|| {
            ReconError::Configuration(format!(
                "Rule '{}': 'confianca' must be a number",
                rule_id
            ))
        })?;
        validate_unit_interval(confidence, "Rule confidence")
            .map_err(|e| ReconError::Configuration(format!("Rule '{}': {}", rule_id, e)))?;
        action.confidence = confidence;
    }

    if let Some(observation) = lookup(value, &["observacao", "observation"]).and_then(Value::as_str) {
        action.observation = Some(observation.to_string());
    }
    if let Some(category) = lookup(value, &["categoria", "category"]).and_then(Value::as_str) {
        action.category = Some(category.to_string());
    }

    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
regras:
  - id: tarifa_doc
    nome: "Tarifa DOC"
    prioridade: 10
    condicoes:
      - campo: descricao
        operador: contains
        valor: ["TARIFA", "TAR "]
      - campo: valor
        operador: between
        valor: [1, "50.00"]
    acao:
      tipo: auto_aprovar
      confianca: 0.95
      observacao: "Tarifa bancaria"
      categoria: "Tarifas"
  - id: desativada
    nome: "Desativada"
    ativo: false
    condicoes:
      - campo: tipo
        operador: equals
        valor: D
    acao:
      tipo: ignorar
"#;

    fn config_error(content: &str) -> String {
        match RuleLoader::parse_str(content) {
            Err(ReconError::Configuration(message)) => message,
            other => panic!("expected configuration error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_parse_valid_rules() {
        let rules = RuleLoader::parse_str(VALID).unwrap();

        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.id, "tarifa_doc");
        assert_eq!(rule.name, "Tarifa DOC");
        assert_eq!(rule.priority, 10);
        assert!(rule.active);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.conditions[0].field, Field::Description);
        assert_eq!(rule.conditions[0].operator(), Operator::Contains);
        assert_eq!(rule.conditions[1].operator(), Operator::Between);
        assert_eq!(rule.action.kind, ActionKind::AutoApprove);
        assert_eq!(rule.action.confidence, 0.95);
        assert_eq!(rule.action.category.as_deref(), Some("Tarifas"));
    }

    #[test]
    fn test_defaults_applied() {
        let rules = RuleLoader::parse_str(
            r#"
regras:
  - id: juros
    nome: Juros
    condicoes:
      - campo: descricao
        operador: regex
        valor: "^JUROS"
    acao:
      tipo: sugerir
"#,
        )
        .unwrap();

        assert_eq!(rules[0].priority, 0);
        assert!(rules[0].active);
        assert_eq!(rules[0].action.confidence, DEFAULT_RULE_CONFIDENCE);
        assert!(rules[0].action.observation.is_none());
    }

    #[test]
    fn test_empty_documents_yield_no_rules() {
        assert!(RuleLoader::parse_str("").unwrap().is_empty());
        assert!(RuleLoader::parse_str("outra_chave: 1\n").unwrap().is_empty());
        assert!(RuleLoader::parse_str("regras: []\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let result = RuleLoader::parse_str("{ invalid yaml content [");
        assert!(matches!(result, Err(ReconError::Yaml(_))));
    }

    #[test]
    fn test_missing_required_fields() {
        let message = config_error(
            "regras:\n  - nome: X\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("'id'"));

        let message = config_error("regras:\n  - id: a\n    nome: A\n    acao: {tipo: ignorar}\n");
        assert!(message.contains("'condicoes'"));

        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n",
        );
        assert!(message.contains("'acao'"));
    }

    #[test]
    fn test_numeric_id_kept_as_text() {
        let rules = RuleLoader::parse_str(
            "regras:\n  - id: 1\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: ignorar}\n",
        )
        .unwrap();
        assert_eq!(rules[0].id, "1");

        let message = config_error(
            "regras:\n  - id: [1, 2]\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("'id' must be a scalar"));

        let message = config_error(
            "regras:\n  - id: 1\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: ignorar}\n  - id: \"1\"\n    nome: B\n    condicoes: [{campo: tipo, operador: equals, valor: C}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("Duplicate rule id '1'"));
    }

    #[test]
    fn test_empty_conditions_rejected() {
        let message =
            config_error("regras:\n  - id: a\n    nome: A\n    condicoes: []\n    acao: {tipo: ignorar}\n");
        assert!(message.contains("cannot be empty"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let message = config_error(
            r#"
regras:
  - id: dup
    nome: A
    condicoes: [{campo: tipo, operador: equals, valor: D}]
    acao: {tipo: auto_aprovar}
  - id: dup
    nome: B
    ativo: false
    condicoes: [{campo: tipo, operador: equals, valor: C}]
    acao: {tipo: auto_aprovar}
"#,
        );
        assert!(message.contains("Duplicate rule id 'dup'"));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: tipo, operador: starts_with, valor: D}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("condition #0"));
        assert!(message.contains("starts_with"));
    }

    #[test]
    fn test_between_requires_two_bounds() {
        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: valor, operador: between, valor: [1, 2, 3]}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("two-element"));
    }

    #[test]
    fn test_invalid_action_kind_rejected() {
        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: apagar}\n",
        );
        assert!(message.contains("apagar"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: descricao, operador: regex, valor: \"([\"}]\n    acao: {tipo: ignorar}\n",
        );
        assert!(message.contains("invalid regex"));
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let message = config_error(
            "regras:\n  - id: a\n    nome: A\n    condicoes: [{campo: tipo, operador: equals, valor: D}]\n    acao: {tipo: auto_aprovar, confianca: 1.5}\n",
        );
        assert!(message.contains("Rule 'a'"));
    }

    #[test]
    fn test_load_missing_file_yields_no_rules() {
        let loader = RuleLoader::new("definitely/not/here/regras.yaml");
        assert!(loader.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tarifas.yaml");
        fs::write(&path, VALID).unwrap();

        let loader = RuleLoader::new(&path);
        assert_eq!(loader.path(), path.as_path());
        assert_eq!(loader.load().unwrap().len(), 1);
    }
}
