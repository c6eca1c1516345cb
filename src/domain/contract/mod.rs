//! Contract - the billed, recurring subscription between parent and tutor.
//!
//! Owns the subscription status state machine, the recurring-failure
//! suspension rule, and the dual-rating closure invariant.

mod aggregate;
mod review;
mod status;

pub use aggregate::{Contract, PaymentConfirmation, MAX_RECURRING_FAILURES};
pub use review::{ContractReview, ReviewerRole};
pub use status::ContractStatus;
