//! Validation utilities

use bigdecimal::BigDecimal;
use std::collections::HashSet;

use crate::types::*;

/// Validate that an amount is strictly positive
pub fn validate_positive_amount(amount: &BigDecimal, what: &str) -> ReconResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(ReconError::Validation(format!(
            "{} must be positive, got {}",
            what, amount
        )))
    } else {
        Ok(())
    }
}

/// Validate that a text field is not blank
pub fn validate_non_empty(value: &str, what: &str) -> ReconResult<()> {
    if value.trim().is_empty() {
        return Err(ReconError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// Validate that a score lies in [0, 1]
pub fn validate_unit_interval(value: f64, what: &str) -> ReconResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ReconError::Validation(format!(
            "{} must be between 0.0 and 1.0, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity between the lower-cased word sets of two texts.
///
/// Returns 0.0 when either text is blank.
pub fn jaccard_similarity(left: &str, right: &str) -> f64 {
    let left = left.to_lowercase();
    let right = right.to_lowercase();

    let left_words: HashSet<&str> = left.split_whitespace().collect();
    let right_words: HashSet<&str> = right.split_whitespace().collect();

    if left_words.is_empty() || right_words.is_empty() {
        return 0.0;
    }

    let intersection = left_words.intersection(&right_words).count();
    let union = left_words.union(&right_words).count();

    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&BigDecimal::from(1), "Amount").is_ok());
        assert!(validate_positive_amount(&BigDecimal::from(0), "Amount").is_err());
        assert!(validate_positive_amount(&BigDecimal::from(-3), "Amount").is_err());
    }

    #[test]
    fn test_unit_interval() {
        assert!(validate_unit_interval(0.0, "Score").is_ok());
        assert!(validate_unit_interval(1.0, "Score").is_ok());
        assert!(validate_unit_interval(1.01, "Score").is_err());
        assert!(validate_unit_interval(f64::NAN, "Score").is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t\tc "), "a b c");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_jaccard_similarity() {
        assert_eq!(jaccard_similarity("Fornecedor XYZ", "fornecedor   xyz"), 1.0);
        assert_eq!(jaccard_similarity("Pagamento Fornecedor XYZ", "Fornecedor XYZ"), 2.0 / 3.0);
        assert_eq!(jaccard_similarity("abc", ""), 0.0);
        assert_eq!(jaccard_similarity("abc", "def"), 0.0);
    }
}
