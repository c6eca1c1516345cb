//! Ports - interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway
//!
//! - `PaymentGateway` - charge initiation, stored-credential charges, the
//!   two-phase step-up protocol, and authoritative status queries
//!
//! ## Persistence
//!
//! - `OfferRepository`, `ContractRepository`, `TransactionRepository`,
//!   `SessionRepository`, `ReviewRepository` - aggregate stores
//! - `BalanceLedger` - tutor balance credits gated on confirmed payment
//!
//! ## Outbound
//!
//! - `Notifier` - fire-and-forget user notifications

mod balance_ledger;
mod contract_repository;
mod notifier;
mod offer_repository;
mod payment_gateway;
mod review_repository;
mod session_repository;
mod transaction_repository;

pub use balance_ledger::BalanceLedger;
pub use contract_repository::ContractRepository;
pub use notifier::{Notification, NotificationOutcome, Notifier};
pub use offer_repository::OfferRepository;
pub use payment_gateway::{
    ChallengeData, ChallengeProof, ChargeOutcome, CompleteStepUpRequest, CustomerContact,
    GatewayError, HostedCheckout, InitiateChargeRequest, PaymentGateway, RecurringChargeRequest,
    RemoteChargeStatus, StepUpChargeRequest, StepUpStart, StoredInstrument,
};
pub use review_repository::ReviewRepository;
pub use session_repository::SessionRepository;
pub use transaction_repository::TransactionRepository;
