//! Foundation - shared value objects and domain primitives.
//!
//! Building blocks used by every other domain module: validated identifiers,
//! timestamps, money, ratings, the state machine trait, and the error types.

mod errors;
mod ids;
mod money;
mod rating;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    ContractId, OfferId, ReviewId, SessionDetailId, SessionScheduleId, TransactionId, UserId,
};
pub use money::Amount;
pub use rating::Rating;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
