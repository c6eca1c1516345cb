//! Tutor balance ledger port.
//!
//! Not a double-entry accounting system: the ledger only needs enough
//! correctness to gate session creation on confirmed money movement.

use async_trait::async_trait;

use crate::domain::foundation::{Amount, DomainError, UserId};

/// Port for crediting tutor balances on confirmed payments.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Credit a tutor's balance by the contract amount.
    async fn credit(&self, tutor_id: &UserId, amount: Amount) -> Result<(), DomainError>;

    /// Current balance for a tutor.
    async fn balance(&self, tutor_id: &UserId) -> Result<Amount, DomainError>;
}
