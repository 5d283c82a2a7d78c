//! Integration tests for reconciliation-core

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use reconciliation_core::{
    utils::MemoryStorage, EngineConfig, ExactMatchStrategy, MatchMethod, MatchStore,
    MatchingStrategy, Receipt, ReconError, ReconcilerSettings, ReconciliationEngine,
    ReconciliationStatistics, ReportFormat, RuleBasedStrategy, RuleLoader, Transaction,
    TransactionType,
};
use std::collections::HashSet;
use std::fs;

const FEE_RULES: &str = r#"
regras:
  - id: tarifa_bancaria
    nome: Tarifa bancaria
    prioridade: 10
    condicoes:
      - campo: descricao
        operador: contains
        valor: TARIFA
      - campo: tipo
        operador: equals
        valor: D
    acao:
      tipo: auto_aprovar
      confianca: 0.95
      observacao: Bank fee
      categoria: Tarifas
  - id: tarifa_doc
    nome: Tarifa DOC
    prioridade: 50
    condicoes:
      - campo: descricao
        operador: contains
        valor: ["TARIFA DOC", "TAR DOC"]
    acao:
      tipo: auto_aprovar
      confianca: 0.98
  - id: iof
    nome: IOF
    prioridade: 5
    condicoes:
      - campo: descricao
        operador: regex
        valor: "^IOF"
      - campo: valor
        operador: less_than
        valor: 100
    acao:
      tipo: auto_aprovar
      confianca: 0.92
"#;

fn day0() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 10).unwrap()
}

fn debit(description: &str, amount: &str) -> Transaction {
    Transaction::new(day0(), amount.parse().unwrap(), description, TransactionType::Debit).unwrap()
}

fn receipt(amount: &str, offset_days: i64) -> Receipt {
    Receipt::new(
        "comprovantes/pagamento.pdf",
        day0() + Duration::days(offset_days),
        amount.parse().unwrap(),
    )
    .unwrap()
}

fn exact_only_engine() -> ReconciliationEngine {
    let strategies: Vec<Box<dyn MatchingStrategy>> = vec![Box::new(ExactMatchStrategy::default())];
    ReconciliationEngine::new(strategies, EngineConfig::default()).unwrap()
}

fn full_engine() -> ReconciliationEngine {
    let rules = RuleLoader::parse_str(FEE_RULES).unwrap();
    let strategies: Vec<Box<dyn MatchingStrategy>> = vec![
        Box::new(ExactMatchStrategy::default()),
        Box::new(RuleBasedStrategy::from_rules(rules)),
    ];
    ReconciliationEngine::new(strategies, EngineConfig::default()).unwrap()
}

#[test]
fn test_exact_match_same_day() {
    let mut engine = exact_only_engine();
    let transactions = vec![debit("PAGTO FORNECEDOR XYZ", "150.00")];
    let receipts = vec![receipt("150.00", 0)];

    let matches = engine.reconcile(&transactions, &receipts).unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].method, MatchMethod::Exact);
    assert!(matches[0].confidence >= 0.80);
    assert_eq!(matches[0].receipt_id, Some(receipts[0].id));
}

#[test]
fn test_date_within_tolerance() {
    let mut engine = exact_only_engine();
    let transactions = vec![debit("BOLETO", "200.00")];
    let receipts = vec![receipt("200.00", 2)];

    let matches = engine.reconcile(&transactions, &receipts).unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].confidence >= 0.60);
    assert!(matches[0].confidence < 0.90);
    assert!(matches[0].requires_review());
}

#[test]
fn test_date_outside_tolerance() {
    let mut engine = exact_only_engine();
    let matches = engine
        .reconcile(&[debit("BOLETO", "200.00")], &[receipt("200.00", 9)])
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_amount_mismatch() {
    let mut engine = exact_only_engine();
    for offset in [-3, 0, 3] {
        let matches = engine
            .reconcile(&[debit("PIX", "100.00")], &[receipt("999.00", offset)])
            .unwrap();
        assert!(matches.is_empty());
    }
}

#[test]
fn test_rule_auto_approval() {
    let mut engine = full_engine();
    let transactions = vec![debit("TARIFA DOC TRANSFERENCIA", "15.00")];

    let matches = engine.reconcile(&transactions, &[]).unwrap();

    assert_eq!(matches.len(), 1);
    assert!(matches[0].receipt_id.is_none());
    assert_eq!(matches[0].method, MatchMethod::Rule);
    assert!(matches[0].confidence >= 0.90);
    assert!(matches[0].can_auto_approve());
}

#[test]
fn test_rule_cascade_stops_at_first_satisfying_rule() {
    let mut engine = full_engine();
    let matches = engine
        .reconcile(&[debit("TARIFA DOC TRANSFERENCIA", "15.00")], &[])
        .unwrap();

    let observations = matches[0].observations.as_deref().unwrap();
    assert!(observations.contains("Rule: tarifa_doc"));
    assert!(!observations.contains("tarifa_bancaria"));
    assert_eq!(matches[0].confidence, 0.98);
}

#[test]
fn test_receipt_reuse_prevention() {
    let mut engine = exact_only_engine();
    let transactions = vec![debit("PAGTO A", "80.00"), debit("PAGTO B", "80.00")];
    let receipts = vec![receipt("80.00", 0)];

    let matches = engine.reconcile(&transactions, &receipts).unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].transaction_id, transactions[0].id);
}

#[test]
fn test_identical_receipts_are_both_usable() {
    let mut engine = exact_only_engine();
    let transactions = vec![debit("PAGTO A", "80.00"), debit("PAGTO B", "80.00")];
    // same contents, distinct handles
    let receipts = vec![receipt("80.00", 0), receipt("80.00", 0)];

    let matches = engine.reconcile(&transactions, &receipts).unwrap();
    assert_eq!(matches.len(), 2);
    assert_ne!(matches[0].receipt_id, matches[1].receipt_id);
}

#[test]
fn test_cascade_precedence() {
    let mut engine = full_engine();
    assert_eq!(engine.strategy_names(), vec!["Rule Based", "Exact Match"]);

    // both strategies could match this transaction
    let transactions = vec![debit("IOF ADICIONAL", "3.50")];
    let receipts = vec![receipt("3.50", 0)];

    let outcome = engine.reconcile_detailed(&transactions, &receipts).unwrap();

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].method, MatchMethod::Rule);
    assert!(outcome.matches[0].receipt_id.is_none());
    assert_eq!(outcome.matches_by_strategy.get("Rule Based"), Some(&1));
}

#[test]
fn test_mixed_statement_properties() {
    let mut engine = full_engine();
    let transactions = vec![
        debit("TARIFA PACOTE SERVICOS", "39.90"),
        debit("PAGTO FORNECEDOR ALFA", "1500.00"),
        debit("PAGTO FORNECEDOR BETA", "1500.00"),
        debit("ALUGUEL", "3200.00"),
        debit("IOF", "2.15"),
        debit("COMPRA CARTAO", "89.90"),
    ];
    let receipts = vec![
        receipt("1500.00", 1),
        receipt("1500.00", 3),
        receipt("3200.00", 8),
        receipt("89.90", -2),
    ];

    let matches = engine.reconcile(&transactions, &receipts).unwrap();

    // no receipt used twice
    let used: Vec<_> = matches.iter().filter_map(|m| m.receipt_id).collect();
    let unique: HashSet<_> = used.iter().copied().collect();
    assert_eq!(used.len(), unique.len());

    // every match respects the configured floor
    let floor = engine.config().min_confidence;
    assert!(matches.iter().all(|m| m.confidence >= floor));

    // rent receipt is outside the date window
    assert!(matches.iter().all(|m| m.transaction_id != transactions[3].id));
    assert_eq!(matches.len(), 5);

    let stats = engine.statistics(&matches, &transactions);
    assert_eq!(stats, engine.statistics(&matches, &transactions));
    assert_eq!(stats.total_transactions, 6);
    assert_eq!(stats.total_matches, 5);
    assert_eq!(stats.by_method[&MatchMethod::Rule], 2);
    assert_eq!(stats.by_method[&MatchMethod::Exact], 3);
    assert_eq!(
        stats.total_reconciled_value,
        "3131.95".parse::<BigDecimal>().unwrap()
    );
    assert_eq!(stats.auto_approved + stats.review_required, stats.total_matches);
}

#[test]
fn test_input_errors_before_work() {
    let mut engine = exact_only_engine();
    assert!(matches!(
        engine.reconcile(&[], &[receipt("1.00", 0)]),
        Err(ReconError::InvalidInput(_))
    ));

    let mut empty = ReconciliationEngine::new(Vec::new(), EngineConfig::default()).unwrap();
    assert!(matches!(
        empty.reconcile(&[debit("X", "1.00")], &[]),
        Err(ReconError::InvalidInput(_))
    ));
}

#[test]
fn test_rule_strategy_works_without_receipts() {
    let mut engine = full_engine();
    let matches = engine
        .reconcile(&[debit("PAGTO", "10.00"), debit("TARIFA", "5.00")], &[])
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].method, MatchMethod::Rule);
}

#[test]
fn test_filtered_reconciliation() {
    let mut engine = exact_only_engine();
    let transactions = vec![debit("PEQUENO", "50.00"), debit("GRANDE", "2500.00")];
    let receipts = vec![receipt("50.00", 0), receipt("2500.00", 0)];

    let threshold = BigDecimal::from(1000);
    let above = |t: &Transaction| t.amount > threshold;
    let matches = engine
        .reconcile_filtered(&transactions, &receipts, Some(&above), None)
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].transaction_id, transactions[1].id);

    let no_receipts = |_: &Receipt| false;
    let matches = engine
        .reconcile_filtered(&transactions, &receipts, None, Some(&no_receipts))
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_confirm_and_undo_flow() {
    let mut engine = exact_only_engine();
    let mut transactions = vec![debit("PAGTO", "42.00")];
    let mut receipts = vec![receipt("42.00", 0)];

    let mut matches = engine.reconcile(&transactions, &receipts).unwrap();
    let m = &mut matches[0];

    m.confirm(Some("analista".to_string()), &mut transactions, &mut receipts)
        .unwrap();
    assert!(transactions[0].reconciled);
    assert!(receipts[0].reconciled);

    m.undo(&mut transactions, &mut receipts).unwrap();
    assert!(!transactions[0].reconciled);
    assert!(!receipts[0].reconciled);
}

#[test]
fn test_reports_render_statistics() {
    let mut engine = full_engine();
    let transactions = vec![debit("TARIFA DOC", "1234.56"), debit("SEM PAR", "7.00")];
    let matches = engine.reconcile(&transactions, &[]).unwrap();

    let text = engine.report(&matches, &transactions, ReportFormat::Text);
    assert!(text.contains("Reconciliation rate: 50.0%"));
    assert!(text.contains("R$ 1,234.56"));

    let markdown = engine.report(&matches, &transactions, ReportFormat::Markdown);
    assert!(markdown.contains("# Reconciliation Report"));
    assert!(markdown.contains("| rule | 1 |"));
}

#[test]
fn test_results_serialize_to_json() {
    let mut engine = full_engine();
    let transactions = vec![debit("TARIFA DOC", "15.00")];
    let outcome = engine.reconcile_detailed(&transactions, &[]).unwrap();

    let json = serde_json::to_value(&outcome.matches[0]).unwrap();
    assert_eq!(json["method"], "rule");
    assert!(json["receipt_id"].is_null());

    let stats = engine.statistics(&outcome.matches, &transactions);
    let encoded = serde_json::to_string(&stats).unwrap();
    let decoded: ReconciliationStatistics = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.total_matches, 1);
    assert_eq!(decoded.by_method[&MatchMethod::Rule], 1);
}

#[test]
fn test_settings_build_engine_with_rule_file() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("regras.yaml");
    fs::write(&rules_path, FEE_RULES).unwrap();

    let settings_path = dir.path().join("settings.yaml");
    fs::write(
        &settings_path,
        format!(
            "engine:\n  min_confidence: 0.7\nexact_match:\n  date_tolerance_days: 2\nrules_file: {}\n",
            rules_path.display()
        ),
    )
    .unwrap();

    let settings = ReconcilerSettings::from_file(&settings_path).unwrap();
    let mut engine = settings.build_engine().unwrap();
    assert_eq!(engine.strategy_names(), vec!["Rule Based", "Exact Match"]);

    let transactions = vec![debit("TARIFA DOC", "15.00"), debit("PAGTO", "300.00")];
    // three days apart: outside the configured two-day window
    let receipts = vec![receipt("300.00", 3)];
    let matches = engine.reconcile(&transactions, &receipts).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].method, MatchMethod::Rule);
}

#[test]
fn test_settings_file_with_relative_rules_and_engine_window() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("regras.yaml"), FEE_RULES).unwrap();

    let settings_path = dir.path().join("settings.yaml");
    fs::write(
        &settings_path,
        "engine:\n  date_tolerance_days: 7\nrules_file: regras.yaml\n",
    )
    .unwrap();

    let settings = ReconcilerSettings::from_file(&settings_path).unwrap();
    assert_eq!(settings.exact_match.date_tolerance_days, 7);
    let mut engine = settings.build_engine().unwrap();

    let transactions = vec![debit("TARIFA DOC", "15.00"), debit("PAGTO", "300.00")];
    let receipts = vec![receipt("300.00", 5)];
    let outcome = engine.reconcile_detailed(&transactions, &receipts).unwrap();

    assert_eq!(outcome.matches.len(), 2);
    assert_eq!(outcome.matches[0].method, MatchMethod::Rule);
    assert_eq!(outcome.matches[1].method, MatchMethod::Exact);
    assert_eq!(outcome.matches[1].receipt_id, Some(receipts[0].id));
    assert!(outcome.matches[1].requires_review());
}

#[test]
fn test_missing_rule_file_degrades_to_exact_matching() {
    let settings = ReconcilerSettings {
        rules_file: Some("does/not/exist.yaml".into()),
        ..ReconcilerSettings::default()
    };
    let mut engine = settings.build_engine().unwrap();

    let transactions = vec![debit("TARIFA DOC", "15.00")];
    let receipts = vec![receipt("15.00", 0)];
    let matches = engine.reconcile(&transactions, &receipts).unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].method, MatchMethod::Exact);
}

#[tokio::test]
async fn test_reconcile_from_collaborators() {
    let transactions = vec![debit("TARIFA MANUTENCAO", "25.00"), debit("PAGTO", "640.00")];
    let receipts = vec![receipt("640.00", -1)];
    let mut storage = MemoryStorage::with_data(transactions.clone(), receipts.clone());

    let mut engine = full_engine();
    let outcome = engine
        .reconcile_sources(&storage.clone(), &storage.clone(), &mut storage)
        .await
        .unwrap();

    assert_eq!(outcome.matches.len(), 2);
    assert!(outcome.failures.is_empty());

    let stored = storage.load_matches().await.unwrap();
    assert_eq!(stored, outcome.matches);
    assert_eq!(stored[1].receipt_id, Some(receipts[0].id));
    assert_eq!(engine.performance().total_runs, 1);
}
