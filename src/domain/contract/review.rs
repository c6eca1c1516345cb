//! Contract review - the dual-rating closure record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ContractId, Rating, ReviewId, Timestamp, UserId};

/// Which side of the contract the reviewer was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    Parent,
    Tutor,
}

/// Rating issued by one party about the other when a contract closes.
///
/// Unique per (contract, reviewer); the contract reaches `Completed` only
/// once both expected reviewers have a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReview {
    /// Unique identifier.
    pub id: ReviewId,

    /// Contract being closed.
    pub contract_id: ContractId,

    /// Party issuing the rating.
    pub reviewer_id: UserId,

    /// Party being rated.
    pub reviewed_id: UserId,

    /// Side of the contract the reviewer was on.
    pub reviewer_role: ReviewerRole,

    /// Star rating.
    pub rating: Rating,

    /// Free-text review.
    pub review: String,

    /// When the review was submitted.
    pub created_at: Timestamp,
}

impl ContractReview {
    /// Creates a new review record.
    pub fn new(
        contract_id: ContractId,
        reviewer_id: UserId,
        reviewed_id: UserId,
        reviewer_role: ReviewerRole,
        rating: Rating,
        review: impl Into<String>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            contract_id,
            reviewer_id,
            reviewed_id,
            reviewer_role,
            rating,
            review: review.into(),
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_both_parties_and_role() {
        let contract_id = ContractId::new();
        let parent = UserId::new("parent-1").unwrap();
        let tutor = UserId::new("tutor-1").unwrap();

        let review = ContractReview::new(
            contract_id,
            parent.clone(),
            tutor.clone(),
            ReviewerRole::Parent,
            Rating::new(5).unwrap(),
            "Great tutor",
        );

        assert_eq!(review.contract_id, contract_id);
        assert_eq!(review.reviewer_id, parent);
        assert_eq!(review.reviewed_id, tutor);
        assert_eq!(review.reviewer_role, ReviewerRole::Parent);
        assert_eq!(review.rating.value(), 5);
    }
}
