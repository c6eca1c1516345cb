//! Review repository port.

use async_trait::async_trait;

use crate::domain::contract::ContractReview;
use crate::domain::foundation::{ContractId, DomainError, UserId};

/// Repository port for contract reviews.
///
/// Implementations enforce the (contract, reviewer) uniqueness that makes
/// `submit_rating` idempotent.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Save a review.
    ///
    /// # Errors
    ///
    /// - `DuplicateReview` if this reviewer already rated this contract
    async fn save(&self, review: &ContractReview) -> Result<(), DomainError>;

    /// Find the review a specific party left on a contract.
    async fn find_by_contract_and_reviewer(
        &self,
        contract_id: &ContractId,
        reviewer_id: &UserId,
    ) -> Result<Option<ContractReview>, DomainError>;

    /// All reviews on a contract (zero, one, or two rows).
    async fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<ContractReview>, DomainError>;
}
