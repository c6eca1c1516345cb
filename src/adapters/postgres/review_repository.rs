//! Contract review persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::contract::{ContractReview, ReviewerRole};
use crate::domain::foundation::{
    ContractId, DomainError, ErrorCode, Rating, ReviewId, Timestamp, UserId,
};
use crate::ports::ReviewRepository;

use super::{db_error, is_unique_violation};

pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    contract_id: Uuid,
    reviewer_id: String,
    reviewed_id: String,
    reviewer_role: String,
    rating: i16,
    review: String,
    created_at: DateTime<Utc>,
}

fn role_str(role: ReviewerRole) -> &'static str {
    match role {
        ReviewerRole::Parent => "parent",
        ReviewerRole::Tutor => "tutor",
    }
}

fn parse_role(value: &str) -> Result<ReviewerRole, DomainError> {
    match value {
        "parent" => Ok(ReviewerRole::Parent),
        "tutor" => Ok(ReviewerRole::Tutor),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown reviewer role in storage: {}", other),
        )),
    }
}

impl TryFrom<ReviewRow> for ContractReview {
    type Error = DomainError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(ContractReview {
            id: ReviewId::from_uuid(row.id),
            contract_id: ContractId::from_uuid(row.contract_id),
            reviewer_id: UserId::new(row.reviewer_id)?,
            reviewed_id: UserId::new(row.reviewed_id)?,
            reviewer_role: parse_role(&row.reviewer_role)?,
            rating: Rating::new(row.rating as u8)?,
            review: row.review,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn save(&self, review: &ContractReview) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO contract_reviews (
                id, contract_id, reviewer_id, reviewed_id, reviewer_role,
                rating, review, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id.as_uuid())
        .bind(review.contract_id.as_uuid())
        .bind(review.reviewer_id.as_str())
        .bind(review.reviewed_id.as_str())
        .bind(role_str(review.reviewer_role))
        .bind(review.rating.value() as i16)
        .bind(&review.review)
        .bind(review.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::new(
                    ErrorCode::DuplicateReview,
                    "This party has already rated the contract",
                )
            } else {
                db_error(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_contract_and_reviewer(
        &self,
        contract_id: &ContractId,
        reviewer_id: &UserId,
    ) -> Result<Option<ContractReview>, DomainError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT * FROM contract_reviews WHERE contract_id = $1 AND reviewer_id = $2",
        )
        .bind(contract_id.as_uuid())
        .bind(reviewer_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(ContractReview::try_from).transpose()
    }

    async fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<ContractReview>, DomainError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT * FROM contract_reviews WHERE contract_id = $1 ORDER BY created_at ASC",
        )
        .bind(contract_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(ContractReview::try_from).collect()
    }
}
