//! Contract persistence.
//!
//! The one-live-contract-per-offer rule is a partial unique index on
//! (offer_id) over live statuses; the insert path maps its violation to
//! `ContractAlreadyExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::contract::{Contract, ContractStatus};
use crate::domain::foundation::{
    Amount, ContractId, DomainError, ErrorCode, OfferId, Timestamp, UserId,
};
use crate::ports::ContractRepository;

use super::{db_error, is_unique_violation};

pub struct PostgresContractRepository {
    pool: PgPool,
}

impl PostgresContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ContractRow {
    id: Uuid,
    offer_id: Uuid,
    parent_id: String,
    tutor_id: String,
    basket_id: String,
    status: String,
    instrument_token: Option<String>,
    next_billing_date: Option<DateTime<Utc>>,
    last_payment_date: Option<DateTime<Utc>>,
    last_payment_amount: Option<i64>,
    failure_count: i32,
    amount: i64,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    dispute_reason: Option<String>,
    disputed_by: Option<String>,
    disputed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_str(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Created => "created",
        ContractStatus::Active => "active",
        ContractStatus::Cancelled => "cancelled",
        ContractStatus::Dispute => "dispute",
        ContractStatus::PendingCompletion => "pending_completion",
        ContractStatus::Completed => "completed",
        ContractStatus::Expired => "expired",
    }
}

fn parse_status(value: &str) -> Result<ContractStatus, DomainError> {
    match value {
        "created" => Ok(ContractStatus::Created),
        "active" => Ok(ContractStatus::Active),
        "cancelled" => Ok(ContractStatus::Cancelled),
        "dispute" => Ok(ContractStatus::Dispute),
        "pending_completion" => Ok(ContractStatus::PendingCompletion),
        "completed" => Ok(ContractStatus::Completed),
        "expired" => Ok(ContractStatus::Expired),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown contract status in storage: {}", other),
        )),
    }
}

impl TryFrom<ContractRow> for Contract {
    type Error = DomainError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        Ok(Contract {
            id: ContractId::from_uuid(row.id),
            offer_id: OfferId::from_uuid(row.offer_id),
            parent_id: UserId::new(row.parent_id)?,
            tutor_id: UserId::new(row.tutor_id)?,
            basket_id: row.basket_id,
            status: parse_status(&row.status)?,
            instrument_token: row.instrument_token,
            next_billing_date: row.next_billing_date.map(Timestamp::from_datetime),
            last_payment_date: row.last_payment_date.map(Timestamp::from_datetime),
            last_payment_amount: row
                .last_payment_amount
                .map(Amount::from_minor_units)
                .transpose()?,
            failure_count: row.failure_count as u32,
            amount: Amount::from_minor_units(row.amount)?,
            start_date: row.start_date.map(Timestamp::from_datetime),
            end_date: row.end_date.map(Timestamp::from_datetime),
            dispute_reason: row.dispute_reason,
            disputed_by: row.disputed_by.map(UserId::new).transpose()?,
            disputed_at: row.disputed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ContractRepository for PostgresContractRepository {
    async fn save(&self, contract: &Contract) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO contracts (
                id, offer_id, parent_id, tutor_id, basket_id, status,
                instrument_token, next_billing_date, last_payment_date,
                last_payment_amount, failure_count, amount, start_date, end_date,
                dispute_reason, disputed_by, disputed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            "#,
        )
        .bind(contract.id.as_uuid())
        .bind(contract.offer_id.as_uuid())
        .bind(contract.parent_id.as_str())
        .bind(contract.tutor_id.as_str())
        .bind(&contract.basket_id)
        .bind(status_str(contract.status))
        .bind(&contract.instrument_token)
        .bind(contract.next_billing_date.map(|t| *t.as_datetime()))
        .bind(contract.last_payment_date.map(|t| *t.as_datetime()))
        .bind(contract.last_payment_amount.map(|a| a.minor_units()))
        .bind(contract.failure_count as i32)
        .bind(contract.amount.minor_units())
        .bind(contract.start_date.map(|t| *t.as_datetime()))
        .bind(contract.end_date.map(|t| *t.as_datetime()))
        .bind(&contract.dispute_reason)
        .bind(contract.disputed_by.as_ref().map(|u| u.as_str()))
        .bind(contract.disputed_at.map(|t| *t.as_datetime()))
        .bind(contract.created_at.as_datetime())
        .bind(contract.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::new(
                    ErrorCode::ContractAlreadyExists,
                    format!("Offer already has a live contract: {}", contract.offer_id),
                )
            } else {
                db_error(e)
            }
        })?;
        Ok(())
    }

    async fn update(&self, contract: &Contract) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE contracts
            SET status = $2,
                instrument_token = $3,
                next_billing_date = $4,
                last_payment_date = $5,
                last_payment_amount = $6,
                failure_count = $7,
                start_date = $8,
                end_date = $9,
                dispute_reason = $10,
                disputed_by = $11,
                disputed_at = $12,
                updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(contract.id.as_uuid())
        .bind(status_str(contract.status))
        .bind(&contract.instrument_token)
        .bind(contract.next_billing_date.map(|t| *t.as_datetime()))
        .bind(contract.last_payment_date.map(|t| *t.as_datetime()))
        .bind(contract.last_payment_amount.map(|a| a.minor_units()))
        .bind(contract.failure_count as i32)
        .bind(contract.start_date.map(|t| *t.as_datetime()))
        .bind(contract.end_date.map(|t| *t.as_datetime()))
        .bind(&contract.dispute_reason)
        .bind(contract.disputed_by.as_ref().map(|u| u.as_str()))
        .bind(contract.disputed_at.map(|t| *t.as_datetime()))
        .bind(contract.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::contract_not_found(contract.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &ContractId) -> Result<Option<Contract>, DomainError> {
        let row = sqlx::query_as::<_, ContractRow>("SELECT * FROM contracts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Contract::try_from).transpose()
    }

    async fn find_live_by_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Option<Contract>, DomainError> {
        let row = sqlx::query_as::<_, ContractRow>(
            "SELECT * FROM contracts WHERE offer_id = $1 AND status IN ('created', 'active')",
        )
        .bind(offer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Contract::try_from).transpose()
    }

    async fn find_due_for_billing(&self, now: &Timestamp) -> Result<Vec<Contract>, DomainError> {
        let rows = sqlx::query_as::<_, ContractRow>(
            r#"
            SELECT * FROM contracts
            WHERE status = 'active' AND next_billing_date <= $1
            ORDER BY next_billing_date ASC
            "#,
        )
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Contract::try_from).collect()
    }
}
