//! Plain-text and markdown renderings of run statistics

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};

use crate::reconciliation::statistics::ReconciliationStatistics;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Markdown,
}

/// Render `stats` in the requested format
pub fn render_report(stats: &ReconciliationStatistics, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => render_text(stats),
        ReportFormat::Markdown => render_markdown(stats),
    }
}

/// Format money as `R$ 1,234.56`
pub fn format_currency(value: &BigDecimal) -> String {
    let rounded = value.with_scale_round(2, RoundingMode::HalfUp).to_string();
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}R$ {}.{}", sign, grouped, fraction)
}

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn render_text(stats: &ReconciliationStatistics) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&rule);
    out.push('\n');
    out.push_str("RECONCILIATION REPORT\n");
    out.push_str(&rule);
    out.push_str("\n\n");

    out.push_str("Summary:\n");
    out.push_str(&format!("  Transactions:        {}\n", stats.total_transactions));
    out.push_str(&format!("  Matches:             {}\n", stats.total_matches));
    out.push_str(&format!("  Unmatched:           {}\n", stats.unmatched()));
    out.push_str(&format!(
        "  Reconciliation rate: {}\n\n",
        percent(stats.reconciliation_rate)
    ));

    out.push_str("Confidence:\n");
    out.push_str(&format!("  Mean: {}\n", percent(stats.mean_confidence)));
    out.push_str(&format!("  Min:  {}\n", percent(stats.min_confidence)));
    out.push_str(&format!("  Max:  {}\n\n", percent(stats.max_confidence)));

    out.push_str("Status:\n");
    out.push_str(&format!("  Auto-approved:   {}\n", stats.auto_approved));
    out.push_str(&format!("  Review required: {}\n\n", stats.review_required));

    out.push_str(&format!(
        "Total reconciled value: {}\n\n",
        format_currency(&stats.total_reconciled_value)
    ));

    out.push_str("By method:\n");
    for (method, count) in &stats.by_method {
        out.push_str(&format!("  {}: {}\n", method, count));
    }
    out.push('\n');

    let buckets = &stats.confidence_buckets;
    out.push_str("By confidence band:\n");
    out.push_str(&format!("  High (>= 90%):     {}\n", buckets.high));
    out.push_str(&format!("  Medium (70%-90%):  {}\n", buckets.medium));
    out.push_str(&format!("  Low (60%-70%):     {}\n", buckets.low));
    out.push_str(&rule);
    out.push('\n');

    out
}

fn render_markdown(stats: &ReconciliationStatistics) -> String {
    let mut out = String::new();

    out.push_str("# Reconciliation Report\n\n");

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Transactions:** {}\n", stats.total_transactions));
    out.push_str(&format!("- **Matches:** {}\n", stats.total_matches));
    out.push_str(&format!("- **Unmatched:** {}\n", stats.unmatched()));
    out.push_str(&format!(
        "- **Reconciliation rate:** {}\n\n",
        percent(stats.reconciliation_rate)
    ));

    out.push_str("## Confidence\n\n");
    out.push_str(&format!("- **Mean:** {}\n", percent(stats.mean_confidence)));
    out.push_str(&format!("- **Min:** {}\n", percent(stats.min_confidence)));
    out.push_str(&format!("- **Max:** {}\n\n", percent(stats.max_confidence)));

    out.push_str("## Status\n\n");
    out.push_str(&format!("- **Auto-approved:** {}\n", stats.auto_approved));
    out.push_str(&format!("- **Review required:** {}\n\n", stats.review_required));

    out.push_str("## Total reconciled value\n\n");
    out.push_str(&format!(
        "**{}**\n\n",
        format_currency(&stats.total_reconciled_value)
    ));

    out.push_str("## By method\n\n");
    out.push_str("| Method | Matches |\n|---|---|\n");
    for (method, count) in &stats.by_method {
        out.push_str(&format!("| {} | {} |\n", method, count));
    }
    out.push('\n');

    let buckets = &stats.confidence_buckets;
    out.push_str("## By confidence band\n\n");
    out.push_str(&format!("- **High (>= 90%):** {}\n", buckets.high));
    out.push_str(&format!("- **Medium (70%-90%):** {}\n", buckets.medium));
    out.push_str(&format!("- **Low (60%-70%):** {}\n", buckets.low));

    out
}
