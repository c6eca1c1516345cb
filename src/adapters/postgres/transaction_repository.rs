//! Transaction persistence and the tutor earnings feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Amount, ContractId, DomainError, ErrorCode, Timestamp, TransactionId, UserId,
};
use crate::domain::payment::{
    BasketId, ChargeKind, OrderStatus, Transaction, TransactionStatus,
};
use crate::ports::TransactionRepository;

use super::db_error;

pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    contract_id: Uuid,
    basket_id: String,
    charge_kind: String,
    invoice_id: Option<String>,
    status: String,
    order_status: String,
    amount: i64,
    child_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_str(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Created => "created",
        TransactionStatus::Paid => "paid",
        TransactionStatus::Failed => "failed",
    }
}

fn parse_status(value: &str) -> Result<TransactionStatus, DomainError> {
    match value {
        "created" => Ok(TransactionStatus::Created),
        "paid" => Ok(TransactionStatus::Paid),
        "failed" => Ok(TransactionStatus::Failed),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown transaction status in storage: {}", other),
        )),
    }
}

fn order_status_str(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "PENDING",
        OrderStatus::Success => "SUCCESS",
        OrderStatus::Failed => "FAILED",
    }
}

fn parse_order_status(value: &str) -> Result<OrderStatus, DomainError> {
    match value {
        "PENDING" => Ok(OrderStatus::Pending),
        "SUCCESS" => Ok(OrderStatus::Success),
        "FAILED" => Ok(OrderStatus::Failed),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown order status in storage: {}", other),
        )),
    }
}

fn charge_kind_str(kind: ChargeKind) -> &'static str {
    match kind {
        ChargeKind::Initial => "initial",
        ChargeKind::Recurring => "recurring",
    }
}

fn parse_charge_kind(value: &str) -> Result<ChargeKind, DomainError> {
    match value {
        "initial" => Ok(ChargeKind::Initial),
        "recurring" => Ok(ChargeKind::Recurring),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown charge kind in storage: {}", other),
        )),
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            contract_id: ContractId::from_uuid(row.contract_id),
            basket_id: BasketId::from_wire(row.basket_id),
            charge_kind: parse_charge_kind(&row.charge_kind)?,
            invoice_id: row.invoice_id,
            status: parse_status(&row.status)?,
            order_status: parse_order_status(&row.order_status)?,
            amount: Amount::from_minor_units(row.amount)?,
            child_name: row.child_name,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, contract_id, basket_id, charge_kind, invoice_id, status,
                order_status, amount, child_name, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.contract_id.as_uuid())
        .bind(transaction.basket_id.as_str())
        .bind(charge_kind_str(transaction.charge_kind))
        .bind(&transaction.invoice_id)
        .bind(status_str(transaction.status))
        .bind(order_status_str(transaction.order_status))
        .bind(transaction.amount.minor_units())
        .bind(&transaction.child_name)
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update(&self, transaction: &Transaction) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET invoice_id = $2, status = $3, order_status = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(&transaction.invoice_id)
        .bind(status_str(transaction.status))
        .bind(order_status_str(transaction.order_status))
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                format!("Transaction not found: {}", transaction.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>("SELECT * FROM transactions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_basket_id(
        &self,
        basket_id: &BasketId,
    ) -> Result<Option<Transaction>, DomainError> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE basket_id = $1",
        )
        .bind(basket_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(Transaction::try_from).transpose()
    }

    async fn find_pending(&self, limit: u32) -> Result<Vec<Transaction>, DomainError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT * FROM transactions
            WHERE status = 'created'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn record_tutor_earning(
        &self,
        tutor_id: &UserId,
        contract_id: &ContractId,
        amount: Amount,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tutor_earnings (tutor_id, contract_id, amount, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(tutor_id.as_str())
        .bind(contract_id.as_uuid())
        .bind(amount.minor_units())
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
