//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::utils::validation::{
    normalize_whitespace, validate_non_empty, validate_positive_amount, validate_unit_interval,
};

/// Confidence from which a match no longer needs human review
pub const AUTO_APPROVE_CONFIDENCE: f64 = 0.90;

/// Confidence from which a match is considered of medium quality
pub const MEDIUM_CONFIDENCE: f64 = 0.70;

/// OCR confidence from which an extraction is considered reliable
pub const RELIABLE_OCR_CONFIDENCE: f64 = 0.80;

/// Opaque handle assigned to a transaction when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle assigned to a receipt at ingestion time.
///
/// "Already used" tracking is keyed on this handle, never on field values:
/// two receipts with identical contents are still distinct entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Direction of a bank statement line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money leaving the account
    #[serde(rename = "D")]
    Debit,
    /// Money entering the account
    #[serde(rename = "C")]
    Credit,
}

impl TransactionType {
    /// Single-letter code used by bank statements and rule files
    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Debit => "D",
            TransactionType::Credit => "C",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Debit => "Debit",
            TransactionType::Credit => "Credit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransactionType {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(TransactionType::Debit),
            "C" => Ok(TransactionType::Credit),
            other => Err(ReconError::Validation(format!(
                "Transaction type must be 'D' (debit) or 'C' (credit), got '{}'",
                other
            ))),
        }
    }
}

/// One bank statement line to be reconciled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Handle used to reference this transaction from matches
    pub id: TransactionId,
    /// Booking date
    pub date: NaiveDate,
    /// Amount, always stored positive
    pub amount: BigDecimal,
    /// Statement history text, whitespace-normalised
    pub description: String,
    /// Debit or credit
    pub transaction_type: TransactionType,
    /// Document reference (cheque, DOC, TED number...)
    pub document: Option<String>,
    /// Category assigned upstream
    pub category: Option<String>,
    /// Running balance after this line
    pub balance: Option<BigDecimal>,
    /// Set when a match involving this transaction is confirmed
    pub reconciled: bool,
}

impl Transaction {
    /// Create a new transaction, validating its invariants
    pub fn new(
        date: NaiveDate,
        amount: BigDecimal,
        description: &str,
        transaction_type: TransactionType,
    ) -> ReconResult<Self> {
        validate_positive_amount(&amount, "Transaction amount")?;
        validate_non_empty(description, "Transaction description")?;

        Ok(Self {
            id: TransactionId::new(),
            date,
            amount,
            description: normalize_whitespace(description),
            transaction_type,
            document: None,
            category: None,
            balance: None,
            reconciled: false,
        })
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_balance(mut self, balance: BigDecimal) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Amount with sign: positive for credits, negative for debits
    pub fn signed_amount(&self) -> BigDecimal {
        match self.transaction_type {
            TransactionType::Credit => self.amount.clone(),
            TransactionType::Debit => -self.amount.clone(),
        }
    }

    pub fn type_label(&self) -> &'static str {
        self.transaction_type.label()
    }

    pub fn mark_reconciled(&mut self) {
        self.reconciled = true;
    }

    pub fn unmark_reconciled(&mut self) {
        self.reconciled = false;
    }
}

/// Coarse quality band shared by match and OCR confidences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= AUTO_APPROVE_CONFIDENCE {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        };
        f.write_str(label)
    }
}

/// Payment proof, optionally extracted by OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Handle used for consumed-receipt tracking
    pub id: ReceiptId,
    /// Path of the source document
    pub file: String,
    /// Payment date
    pub date: NaiveDate,
    /// Amount, always stored positive
    pub amount: BigDecimal,
    pub beneficiary: Option<String>,
    pub description: Option<String>,
    /// Kind of document (invoice, boleto, receipt...)
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    /// OCR extraction confidence in [0, 1]; 0 when not OCR-derived
    pub ocr_confidence: f64,
    /// Raw extracted text
    pub full_text: Option<String>,
    /// When the receipt was extracted
    pub extracted_at: NaiveDateTime,
    /// Set when a match involving this receipt is confirmed
    pub reconciled: bool,
}

impl Receipt {
    /// Create a new receipt, validating its invariants
    pub fn new(file: &str, date: NaiveDate, amount: BigDecimal) -> ReconResult<Self> {
        validate_non_empty(file, "Receipt file")?;
        validate_positive_amount(&amount, "Receipt amount")?;

        Ok(Self {
            id: ReceiptId::new(),
            file: file.trim().replace('\\', "/"),
            date,
            amount,
            beneficiary: None,
            description: None,
            document_type: None,
            document_number: None,
            ocr_confidence: 0.0,
            full_text: None,
            extracted_at: chrono::Utc::now().naive_utc(),
            reconciled: false,
        })
    }

    pub fn with_beneficiary(mut self, beneficiary: &str) -> Self {
        self.beneficiary = Some(normalize_whitespace(beneficiary));
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(normalize_whitespace(description));
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn with_document_number(mut self, document_number: impl Into<String>) -> Self {
        self.document_number = Some(document_number.into());
        self
    }

    pub fn with_full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = Some(text.into());
        self
    }

    /// Attach the OCR confidence, which must lie in [0, 1]
    pub fn with_ocr_confidence(mut self, confidence: f64) -> ReconResult<Self> {
        validate_unit_interval(confidence, "OCR confidence")?;
        self.ocr_confidence = confidence;
        Ok(self)
    }

    /// File name without its directory
    pub fn file_name(&self) -> &str {
        Path::new(&self.file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.file)
    }

    /// File extension including the leading dot, or an empty string
    pub fn extension(&self) -> String {
        Path::new(&self.file)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }

    pub fn ocr_confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.ocr_confidence)
    }

    /// Whether the extraction is reliable enough to boost match scores
    pub fn has_good_quality(&self) -> bool {
        self.ocr_confidence >= RELIABLE_OCR_CONFIDENCE
    }

    pub fn mark_reconciled(&mut self) {
        self.reconciled = true;
    }

    pub fn unmark_reconciled(&mut self) {
        self.reconciled = false;
    }
}

/// Algorithm that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Amount and date proximity against a receipt
    Exact,
    /// Declarative rule, no receipt involved
    Rule,
    Fuzzy,
    Aggregate,
    Manual,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Rule => "rule",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Aggregate => "aggregate",
            MatchMethod::Manual => "manual",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMethod {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMethod::Exact),
            "rule" => Ok(MatchMethod::Rule),
            "fuzzy" => Ok(MatchMethod::Fuzzy),
            "aggregate" => Ok(MatchMethod::Aggregate),
            "manual" => Ok(MatchMethod::Manual),
            other => Err(ReconError::Validation(format!(
                "Unknown match method '{}'",
                other
            ))),
        }
    }
}

/// An accepted pairing of a transaction with a receipt, or a rule-based
/// auto-approval without one.
///
/// A match references its transaction and receipt by handle; it owns neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub transaction_id: TransactionId,
    /// `None` for rule-based auto-matches
    pub receipt_id: Option<ReceiptId>,
    /// Score in [0, 1]
    pub confidence: f64,
    pub method: MatchMethod,
    pub observations: Option<String>,
    pub confirmed: bool,
    pub confirmed_by: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Match {
    /// Create a new match, validating the confidence range
    pub fn new(
        transaction_id: TransactionId,
        receipt_id: Option<ReceiptId>,
        confidence: f64,
        method: MatchMethod,
        observations: Option<String>,
    ) -> ReconResult<Self> {
        validate_unit_interval(confidence, "Match confidence")?;

        let observations = observations
            .map(|text| normalize_whitespace(&text))
            .filter(|text| !text.is_empty());

        Ok(Self {
            id: Uuid::new_v4(),
            transaction_id,
            receipt_id,
            confidence,
            method,
            observations,
            confirmed: false,
            confirmed_by: None,
            created_at: chrono::Utc::now().naive_utc(),
        })
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence)
    }

    /// Below auto-approval and not yet confirmed by a person
    pub fn requires_review(&self) -> bool {
        self.confidence < AUTO_APPROVE_CONFIDENCE && !self.confirmed
    }

    pub fn can_auto_approve(&self) -> bool {
        self.confidence >= AUTO_APPROVE_CONFIDENCE
    }

    /// Confirm the match and flag the linked transaction and receipt as
    /// reconciled. Nothing is modified when either entity is missing.
    pub fn confirm(
        &mut self,
        user: Option<String>,
        transactions: &mut [Transaction],
        receipts: &mut [Receipt],
    ) -> ReconResult<()> {
        let (transaction_idx, receipt_idx) = self.locate(transactions, receipts)?;

        self.confirmed = true;
        if user.is_some() {
            self.confirmed_by = user;
        }

        transactions[transaction_idx].mark_reconciled();
        if let Some(idx) = receipt_idx {
            receipts[idx].mark_reconciled();
        }

        Ok(())
    }

    /// Revert a confirmation, clearing the reconciled flags again
    pub fn undo(
        &mut self,
        transactions: &mut [Transaction],
        receipts: &mut [Receipt],
    ) -> ReconResult<()> {
        let (transaction_idx, receipt_idx) = self.locate(transactions, receipts)?;

        self.confirmed = false;
        self.confirmed_by = None;

        transactions[transaction_idx].unmark_reconciled();
        if let Some(idx) = receipt_idx {
            receipts[idx].unmark_reconciled();
        }

        Ok(())
    }

    fn locate(
        &self,
        transactions: &[Transaction],
        receipts: &[Receipt],
    ) -> ReconResult<(usize, Option<usize>)> {
        let transaction_idx = transactions
            .iter()
            .position(|t| t.id == self.transaction_id)
            .ok_or(ReconError::TransactionNotFound(self.transaction_id))?;

        let receipt_idx = match self.receipt_id {
            Some(receipt_id) => Some(
                receipts
                    .iter()
                    .position(|r| r.id == receipt_id)
                    .ok_or(ReconError::ReceiptNotFound(receipt_id))?,
            ),
            None => None,
        };

        Ok((transaction_idx, receipt_idx))
    }
}

/// Errors that can occur in the reconciliation engine
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Strategy '{strategy}' failed: {message}")]
    Strategy { strategy: String, message: String },
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(ReceiptId),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for reconciliation operations
pub type ReconResult<T> = Result<T, ReconError>;
