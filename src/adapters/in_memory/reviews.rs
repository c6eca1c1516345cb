use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::contract::ContractReview;
use crate::domain::foundation::{ContractId, DomainError, ErrorCode, ReviewId, UserId};
use crate::ports::ReviewRepository;

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<HashMap<ReviewId, ContractReview>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn save(&self, review: &ContractReview) -> Result<(), DomainError> {
        let mut reviews = self.reviews.write().await;
        let duplicate = reviews
            .values()
            .any(|r| r.contract_id == review.contract_id && r.reviewer_id == review.reviewer_id);
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::DuplicateReview,
                "This party has already rated the contract",
            ));
        }
        reviews.insert(review.id, review.clone());
        Ok(())
    }

    async fn find_by_contract_and_reviewer(
        &self,
        contract_id: &ContractId,
        reviewer_id: &UserId,
    ) -> Result<Option<ContractReview>, DomainError> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .find(|r| &r.contract_id == contract_id && &r.reviewer_id == reviewer_id)
            .cloned())
    }

    async fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<ContractReview>, DomainError> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .filter(|r| &r.contract_id == contract_id)
            .cloned()
            .collect())
    }
}
