//! In-memory repository doubles.
//!
//! Back the handler and workflow tests; they enforce the same uniqueness
//! rules as the Postgres adapters so tests exercise the real error paths.

mod contracts;
mod ledger;
mod offers;
mod reviews;
mod sessions;
mod transactions;

pub use contracts::InMemoryContractRepository;
pub use ledger::InMemoryBalanceLedger;
pub use offers::InMemoryOfferRepository;
pub use reviews::InMemoryReviewRepository;
pub use sessions::InMemorySessionRepository;
pub use transactions::InMemoryTransactionRepository;
