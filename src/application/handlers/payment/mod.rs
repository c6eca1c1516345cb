//! Payment use cases.
//!
//! All confirmation paths (webhook notification, synchronous recurring
//! response, step-up completion, reconciliation) funnel into the single
//! idempotent [`ConfirmPaymentHandler`] keyed by basket id.

mod charge_recurring;
mod confirm_payment;
mod handle_gateway_notification;
mod start_subscription;
mod step_up_charge;

pub use charge_recurring::{
    ChargeRecurringCommand, ChargeRecurringHandler, RecurringChargeResult,
};
pub use confirm_payment::{
    ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult, PaymentFailureResult,
};
pub use handle_gateway_notification::{HandleGatewayNotificationHandler, NotificationResult};
pub use start_subscription::{
    StartSubscriptionCommand, StartSubscriptionHandler, StartSubscriptionResult,
};
pub use step_up_charge::{
    CompleteStepUpCommand, CompleteStepUpResult, StartStepUpCommand, StartStepUpResult,
    StepUpChargeHandler,
};
