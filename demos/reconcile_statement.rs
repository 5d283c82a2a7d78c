//! End-to-end reconciliation of a small bank statement

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::utils::MemoryStorage;
use reconciliation_core::{
    MatchStore, Receipt, ReconcilerSettings, ReportFormat, Transaction, TransactionType,
};
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn money(value: &str) -> Result<BigDecimal, Box<dyn std::error::Error>> {
    Ok(BigDecimal::from_str(value)?)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!("Reconciliation Core - Statement Reconciliation Example\n");

    // 1. Settings and strategies
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let settings = ReconcilerSettings::from_file(root.join("demos/config/settings.yaml"))?;

    let mut engine = settings.build_engine()?;
    println!("Strategies (cascade order): {:?}\n", engine.strategy_names());

    // 2. Statement lines and receipts, as ingestion would hand them over
    let transactions = vec![
        Transaction::new(day(3), money("15.00")?, "TARIFA DOC TRANSFERENCIA", TransactionType::Debit)?,
        Transaction::new(day(3), money("1500.00")?, "PAGTO FORNECEDOR ALFA LTDA", TransactionType::Debit)?
            .with_document("000123"),
        Transaction::new(day(4), money("0.38")?, "IOF ADICIONAL", TransactionType::Debit)?,
        Transaction::new(day(5), money("289.90")?, "BOLETO ENERGIA ELETRICA", TransactionType::Debit)?,
        Transaction::new(day(6), money("3200.00")?, "ALUGUEL SALA COMERCIAL", TransactionType::Debit)?,
        Transaction::new(day(7), money("42.17")?, "JUROS CHEQUE ESPECIAL", TransactionType::Debit)?,
        Transaction::new(day(8), money("89.90")?, "COMPRA CARTAO PAPELARIA", TransactionType::Debit)?,
        Transaction::new(day(10), money("5000.00")?, "TED RECEBIDA CLIENTE", TransactionType::Credit)?,
    ];

    let receipts = vec![
        Receipt::new("comprovantes/nf_alfa_123.pdf", day(3), money("1500.00")?)?
            .with_beneficiary("Fornecedor Alfa Ltda")
            .with_document_type("nota_fiscal")
            .with_ocr_confidence(0.96)?,
        Receipt::new("comprovantes/energia_nov.pdf", day(7), money("289.90")?)?
            .with_beneficiary("Companhia de Energia")
            .with_ocr_confidence(0.72)?,
        Receipt::new("comprovantes/aluguel.jpg", day(15), money("3200.00")?)?,
        Receipt::new("comprovantes/papelaria.png", day(7), money("89.90")?)?
            .with_ocr_confidence(0.88)?,
    ];

    // 3. Run through the collaborator contracts
    let mut storage = MemoryStorage::with_data(transactions.clone(), receipts.clone());
    let outcome = engine
        .reconcile_sources(&storage.clone(), &storage.clone(), &mut storage)
        .await?;

    println!("\nMatches:");
    for m in &outcome.matches {
        let transaction = transactions
            .iter()
            .find(|t| t.id == m.transaction_id)
            .ok_or("match references an unknown transaction")?;
        let receipt = m
            .receipt_id
            .and_then(|id| receipts.iter().find(|r| r.id == id))
            .map(|r| r.file_name().to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<28} {:>10}  {:<10} {:>5.1}%  {:<18} {}",
            transaction.description,
            transaction.amount.to_string(),
            m.method.as_str(),
            m.confidence * 100.0,
            receipt,
            if m.requires_review() { "REVIEW" } else { "OK" }
        );
        if let Some(observations) = &m.observations {
            println!("      {}", observations);
        }
    }

    let matched: Vec<_> = outcome.matches.iter().map(|m| m.transaction_id).collect();
    println!("\nUnmatched:");
    for transaction in transactions.iter().filter(|t| !matched.contains(&t.id)) {
        println!("  {} {} {}", transaction.date, transaction.description, transaction.amount);
    }

    // 4. Confirm the auto-approved matches
    let mut transactions = transactions;
    let mut receipts = receipts;
    let mut stored = storage.load_matches().await?;
    for m in stored.iter_mut().filter(|m| m.can_auto_approve()) {
        m.confirm(Some("demo".to_string()), &mut transactions, &mut receipts)?;
    }
    let reconciled = transactions.iter().filter(|t| t.reconciled).count();
    println!("\nConfirmed {} auto-approved transactions", reconciled);

    // 5. Statistics and reports
    println!("\n{}", engine.report(&outcome.matches, &transactions, ReportFormat::Text));

    let stats = engine.statistics(&outcome.matches, &transactions);
    println!("Statistics as JSON:\n{}", serde_json::to_string_pretty(&stats)?);

    let metrics = engine.performance();
    println!(
        "\nRuns: {}, total {:.4}s, mean {:.4}s",
        metrics.total_runs, metrics.total_time_secs, metrics.mean_time_secs
    );

    Ok(())
}
