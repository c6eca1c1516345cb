//! Payment - gateway wire semantics and the transaction record.
//!
//! Basket-id generation (with the charge-kind tag decided up front), request
//! signing, inbound-notification hash validation, and the append-only
//! transaction lifecycle.

mod basket;
mod notification;
mod signature;
mod transaction;

pub use basket::{BasketId, BasketPrefixes, ChargeKind};
pub use notification::{GatewayNotification, GATEWAY_SUCCESS_CODE};
pub use signature::{notification_hash, sign_request, verify_notification_hash};
pub use transaction::{OrderStatus, Transaction, TransactionStatus};
