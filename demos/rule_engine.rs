//! Loading a rule file and evaluating statement lines against it

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::{
    Action, ActionKind, Field, Literal, Predicate, Rule, RuleBasedStrategy, RuleEngine,
    RuleLoader, Transaction, TransactionType,
};
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("Reconciliation Core - Rule Engine Example\n");

    // 1. Rules from a file
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/config/regras.yaml");
    let rules = RuleLoader::new(&path).load()?;
    let engine = RuleEngine::new(rules);

    println!("Loaded {} active rules:", engine.len());
    for rule in engine.rules() {
        println!(
            "  [{:>3}] {:<24} {} condition(s) -> {} ({:.0}%)",
            rule.priority,
            rule.id,
            rule.conditions.len(),
            rule.action.kind,
            rule.action.confidence * 100.0
        );
    }
    println!();

    // 2. Evaluate statement lines
    let date = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
    let lines = [
        ("TARIFA DOC TRANSFERENCIA", "15.00", TransactionType::Debit),
        ("TARIFA PACOTE SERVICOS", "39.90", TransactionType::Debit),
        ("IOF ADICIONAL", "1.27", TransactionType::Debit),
        ("JUROS CHEQUE ESPECIAL", "42.17", TransactionType::Debit),
        ("RENDIMENTO POUPANCA", "12.30", TransactionType::Credit),
        ("PAGTO FORNECEDOR", "800.00", TransactionType::Debit),
    ];

    for (description, amount, kind) in lines {
        let transaction =
            Transaction::new(date, BigDecimal::from_str(amount)?, description, kind)?;
        match engine.evaluate(&transaction)? {
            Some(m) => println!(
                "  {:<26} -> {:.0}% {}",
                description,
                m.confidence * 100.0,
                m.observations.unwrap_or_default()
            ),
            None => println!("  {:<26} -> no rule", description),
        }
    }
    println!();

    // 3. Rules built in code
    let large_debit = Rule::new(
        "grande_debito",
        "Large debit",
        Action::new(ActionKind::Suggest)
            .with_confidence(0.70)
            .with_observation("Large debit, check approval"),
    )
    .with_priority(100)
    .with_condition(Field::Type, Predicate::Equals(Literal::Text("D".to_string())))
    .with_condition(
        Field::Amount,
        Predicate::GreaterThan(Literal::Number(BigDecimal::from(500))),
    );

    let strategy = RuleBasedStrategy::from_rules(vec![large_debit]).with_name("Large debits");
    println!("{}", serde_json::to_string_pretty(&strategy.summary())?);

    Ok(())
}
