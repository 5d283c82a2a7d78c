//! In-memory collaborator implementation for testing

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory statement, receipt and match storage for testing and development
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    transactions: Arc<RwLock<Vec<Transaction>>>,
    receipts: Arc<RwLock<Vec<Receipt>>>,
    matches: Arc<RwLock<Vec<Match>>>,
}

impl MemoryStorage {
    /// Create an empty storage instance
    pub fn new() -> Self {
        Self {
            transactions: Arc::new(RwLock::new(Vec::new())),
            receipts: Arc::new(RwLock::new(Vec::new())),
            matches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a storage instance pre-loaded with statement lines and receipts
    pub fn with_data(transactions: Vec<Transaction>, receipts: Vec<Receipt>) -> Self {
        Self {
            transactions: Arc::new(RwLock::new(transactions)),
            receipts: Arc::new(RwLock::new(receipts)),
            matches: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_transaction(&self, transaction: Transaction) -> ReconResult<()> {
        self.transactions
            .write()
            .map_err(|_| poisoned("transactions"))?
            .push(transaction);
        Ok(())
    }

    pub fn add_receipt(&self, receipt: Receipt) -> ReconResult<()> {
        self.receipts
            .write()
            .map_err(|_| poisoned("receipts"))?
            .push(receipt);
        Ok(())
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> ReconResult<()> {
        self.transactions
            .write()
            .map_err(|_| poisoned("transactions"))?
            .clear();
        self.receipts.write().map_err(|_| poisoned("receipts"))?.clear();
        self.matches.write().map_err(|_| poisoned("matches"))?.clear();
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(what: &str) -> ReconError {
    ReconError::Storage(format!("{} lock poisoned", what))
}

#[async_trait]
impl StatementSource for MemoryStorage {
    async fn load_transactions(&self) -> ReconResult<Vec<Transaction>> {
        Ok(self
            .transactions
            .read()
            .map_err(|_| poisoned("transactions"))?
            .clone())
    }
}

#[async_trait]
impl ReceiptSource for MemoryStorage {
    async fn load_receipts(&self) -> ReconResult<Vec<Receipt>> {
        Ok(self
            .receipts
            .read()
            .map_err(|_| poisoned("receipts"))?
            .clone())
    }
}

#[async_trait]
impl MatchStore for MemoryStorage {
    async fn save_matches(&mut self, matches: &[Match]) -> ReconResult<()> {
        self.matches
            .write()
            .map_err(|_| poisoned("matches"))?
            .extend_from_slice(matches);
        Ok(())
    }

    async fn load_matches(&self) -> ReconResult<Vec<Match>> {
        Ok(self.matches.read().map_err(|_| poisoned("matches"))?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_round_trip_through_storage() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        let txn =
            Transaction::new(date, BigDecimal::from(42), "PIX ENVIADO", TransactionType::Debit)
                .unwrap();
        let receipt = Receipt::new("pix.pdf", date, BigDecimal::from(42)).unwrap();

        let mut storage = MemoryStorage::new();
        storage.add_transaction(txn.clone()).unwrap();
        storage.add_receipt(receipt.clone()).unwrap();

        assert_eq!(storage.load_transactions().await.unwrap(), vec![txn.clone()]);
        assert_eq!(storage.load_receipts().await.unwrap(), vec![receipt.clone()]);

        let m = Match::new(txn.id, Some(receipt.id), 0.8, MatchMethod::Exact, None).unwrap();
        storage.save_matches(&[m.clone()]).await.unwrap();
        assert_eq!(storage.load_matches().await.unwrap(), vec![m]);

        storage.clear().unwrap();
        assert!(storage.load_transactions().await.unwrap().is_empty());
        assert!(storage.load_matches().await.unwrap().is_empty());
    }
}
