//! Transaction repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ContractId, DomainError, TransactionId, UserId};
use crate::domain::foundation::Amount;
use crate::domain::payment::{BasketId, Transaction};

/// Repository port for payment-attempt rows.
///
/// Rows are append-only except for status transitions; the basket id is
/// unique per attempt and is the correlation key for gateway notifications.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Save a new attempt.
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Update an existing attempt (status transitions only).
    async fn update(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Find an attempt by id.
    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError>;

    /// Find the attempt for a basket id.
    async fn find_by_basket_id(
        &self,
        basket_id: &BasketId,
    ) -> Result<Option<Transaction>, DomainError>;

    /// All attempts still in the intermediate `Created` status, oldest
    /// first. The reconciliation loop works through these.
    async fn find_pending(&self, limit: u32) -> Result<Vec<Transaction>, DomainError>;

    /// Record a tutor-side earning entry for a confirmed payment.
    async fn record_tutor_earning(
        &self,
        tutor_id: &UserId,
        contract_id: &ContractId,
        amount: Amount,
    ) -> Result<(), DomainError>;
}
