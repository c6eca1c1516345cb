//! Contract repository port (write side of the subscription ledger).

use async_trait::async_trait;

use crate::domain::contract::Contract;
use crate::domain::foundation::{ContractId, DomainError, OfferId};

/// Repository port for Contract aggregate persistence.
///
/// Implementations must ensure:
/// - at most one live (`Created`/`Active`) contract per offer
/// - updates serialize per contract row (row-level locking or
///   compare-and-set on status)
#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// Save a new contract.
    ///
    /// # Errors
    ///
    /// - `ContractAlreadyExists` if the offer already has a live contract
    /// - `DatabaseError` on persistence failure
    async fn save(&self, contract: &Contract) -> Result<(), DomainError>;

    /// Update an existing contract.
    async fn update(&self, contract: &Contract) -> Result<(), DomainError>;

    /// Find a contract by id. Returns `None` if not found.
    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError>;

    /// Find the live contract for an offer, if any.
    async fn find_live_by_offer(&self, offer_id: &OfferId)
        -> Result<Option<Contract>, DomainError>;

    /// Contracts due for a recurring charge at or before `now`.
    async fn find_due_for_billing(
        &self,
        now: &crate::domain::foundation::Timestamp,
    ) -> Result<Vec<Contract>, DomainError>;
}
