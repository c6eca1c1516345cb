//! Inbound gateway notification processing.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::domain::foundation::{Amount, DomainError, ErrorCode};
use crate::domain::payment::{
    verify_notification_hash, BasketId, BasketPrefixes, GatewayNotification,
};
use crate::ports::TransactionRepository;

use super::{ConfirmPaymentHandler, ConfirmPaymentResult, PaymentFailureResult};

/// Outcome of processing a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// The payment was applied by this notification.
    Confirmed,

    /// The charge was already settled (duplicate delivery, or the
    /// reconciliation loop got there first).
    AlreadyProcessed,

    /// The failure was recorded.
    FailureRecorded,
}

/// Validates and routes a pushed gateway notification.
///
/// The validation hash is checked before anything else; a mismatched
/// notification is discarded without touching any state. Charge class comes
/// from the stored transaction, with the configured prefix table as the
/// logged fallback for diagnostics.
pub struct HandleGatewayNotificationHandler {
    merchant_id: String,
    secret: String,
    prefixes: BasketPrefixes,
    transactions: Arc<dyn TransactionRepository>,
    confirm: Arc<ConfirmPaymentHandler>,
}

impl HandleGatewayNotificationHandler {
    pub fn new(
        config: &GatewayConfig,
        transactions: Arc<dyn TransactionRepository>,
        confirm: Arc<ConfirmPaymentHandler>,
    ) -> Self {
        Self {
            merchant_id: config.merchant_id.clone(),
            secret: config.secret().to_string(),
            prefixes: config.basket_prefixes(),
            transactions,
            confirm,
        }
    }

    pub async fn handle(
        &self,
        notification: GatewayNotification,
    ) -> Result<NotificationResult, DomainError> {
        if !verify_notification_hash(
            &notification.validation_hash,
            &notification.basket_id,
            &self.secret,
            &self.merchant_id,
            &notification.err_code,
        ) {
            warn!(
                basket_id = %notification.basket_id,
                "Discarding notification with invalid validation hash"
            );
            return Err(DomainError::new(
                ErrorCode::SignatureMismatch,
                "Notification validation hash does not match",
            ));
        }

        let basket_id = BasketId::from_wire(notification.basket_id.clone());
        let transaction = self.transactions.find_by_basket_id(&basket_id).await?;
        let Some(transaction) = transaction else {
            warn!(
                basket_id = %basket_id,
                prefix_class = ?self.prefixes.classify(basket_id.as_str()),
                "Notification for unknown basket id"
            );
            return Err(DomainError::new(
                ErrorCode::TransactionNotFound,
                format!("No transaction for basket id {}", basket_id),
            ));
        };

        info!(
            basket_id = %basket_id,
            charge_kind = ?transaction.charge_kind,
            err_code = %notification.err_code,
            "Gateway notification received"
        );

        if notification.is_success() {
            let command = super::ConfirmPaymentCommand {
                basket_id,
                invoice_id: notification.transaction_id.clone(),
                amount: Amount::from_minor_units(notification.transaction_amount)?,
                instrument_token: notification
                    .storable_instrument_token()
                    .map(String::from),
            };
            match self.confirm.handle(command).await? {
                ConfirmPaymentResult::Confirmed { .. } => Ok(NotificationResult::Confirmed),
                ConfirmPaymentResult::AlreadyConfirmed { .. } => {
                    Ok(NotificationResult::AlreadyProcessed)
                }
            }
        } else {
            let invoice = if notification.transaction_id.is_empty() {
                None
            } else {
                Some(notification.transaction_id.clone())
            };
            match self
                .confirm
                .record_failure(
                    &basket_id,
                    &notification.err_code,
                    &notification.err_msg,
                    invoice,
                )
                .await?
            {
                PaymentFailureResult::Recorded { .. } => Ok(NotificationResult::FailureRecorded),
                PaymentFailureResult::AlreadyResolved { .. } => {
                    Ok(NotificationResult::AlreadyProcessed)
                }
            }
        }
    }
}
