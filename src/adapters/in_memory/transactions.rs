use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{Amount, ContractId, DomainError, ErrorCode, TransactionId, UserId};
use crate::domain::payment::{BasketId, Transaction, TransactionStatus};
use crate::ports::TransactionRepository;

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
    earnings: RwLock<Vec<(UserId, ContractId, Amount)>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded tutor earnings, for test assertions.
    pub async fn earnings(&self) -> Vec<(UserId, ContractId, Amount)> {
        self.earnings.read().await.clone()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut transactions = self.transactions.write().await;
        if transactions
            .values()
            .any(|t| t.basket_id == transaction.basket_id)
        {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Duplicate basket id: {}", transaction.basket_id),
            ));
        }
        transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let mut transactions = self.transactions.write().await;
        if !transactions.contains_key(&transaction.id) {
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                format!("Transaction not found: {}", transaction.id),
            ));
        }
        transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        Ok(self.transactions.read().await.get(id).cloned())
    }

    async fn find_by_basket_id(
        &self,
        basket_id: &BasketId,
    ) -> Result<Option<Transaction>, DomainError> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .find(|t| &t.basket_id == basket_id)
            .cloned())
    }

    async fn find_pending(&self, limit: u32) -> Result<Vec<Transaction>, DomainError> {
        let mut pending: Vec<Transaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.status == TransactionStatus::Created)
            .cloned()
            .collect();
        pending.sort_by_key(|t| t.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn record_tutor_earning(
        &self,
        tutor_id: &UserId,
        contract_id: &ContractId,
        amount: Amount,
    ) -> Result<(), DomainError> {
        self.earnings
            .write()
            .await
            .push((tutor_id.clone(), *contract_id, amount));
        Ok(())
    }
}
