//! Tutor balance persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{Amount, DomainError, UserId};
use crate::ports::BalanceLedger;

use super::db_error;

pub struct PostgresBalanceLedger {
    pool: PgPool,
}

impl PostgresBalanceLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceLedger for PostgresBalanceLedger {
    async fn credit(&self, tutor_id: &UserId, amount: Amount) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tutor_balances (tutor_id, balance)
            VALUES ($1, $2)
            ON CONFLICT (tutor_id)
            DO UPDATE SET balance = tutor_balances.balance + EXCLUDED.balance
            "#,
        )
        .bind(tutor_id.as_str())
        .bind(amount.minor_units())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn balance(&self, tutor_id: &UserId) -> Result<Amount, DomainError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM tutor_balances WHERE tutor_id = $1")
                .bind(tutor_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(Amount::from_minor_units(balance.unwrap_or(0))?)
    }
}
