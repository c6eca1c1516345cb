//! PostgreSQL adapters built on sqlx.
//!
//! Each repository owns its row struct and the status-string conversions
//! for its aggregate. Uniqueness rules live in the schema (see
//! `migrations/`); unique violations are mapped back to the domain error
//! the ports document.

mod balance_ledger;
mod contract_repository;
mod offer_repository;
mod review_repository;
mod session_repository;
mod transaction_repository;

pub use balance_ledger::PostgresBalanceLedger;
pub use contract_repository::PostgresContractRepository;
pub use offer_repository::PostgresOfferRepository;
pub use review_repository::PostgresReviewRepository;
pub use session_repository::PostgresSessionRepository;
pub use transaction_repository::PostgresTransactionRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, err.to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
