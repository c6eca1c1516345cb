//! Off-session recurring charge against the stored credential.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::contract::ContractStatus;
use crate::domain::foundation::{ContractId, DomainError, ErrorCode};
use crate::domain::payment::{BasketId, BasketPrefixes, ChargeKind, Transaction};
use crate::ports::{
    ContractRepository, CustomerContact, OfferRepository, PaymentGateway, RecurringChargeRequest,
    TransactionRepository,
};

use super::{ConfirmPaymentCommand, ConfirmPaymentHandler, PaymentFailureResult};

/// Request to bill one due contract.
#[derive(Debug, Clone)]
pub struct ChargeRecurringCommand {
    pub contract_id: ContractId,
    pub customer: CustomerContact,
}

/// Outcome of a recurring charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurringChargeResult {
    /// Approved and applied.
    Confirmed,

    /// Declined. `suspended` is true when this was the third consecutive
    /// failure and the contract expired.
    Failed { suspended: bool },

    /// Outcome indeterminate (timeout or network fault); the transaction is
    /// left pending for reconciliation.
    Pending,
}

/// Issues an off-session charge for an active contract with a stored
/// credential.
///
/// The transaction row is persisted before the gateway call so every attempt
/// is visible to reconciliation even if the response never arrives.
pub struct ChargeRecurringHandler {
    contracts: Arc<dyn ContractRepository>,
    offers: Arc<dyn OfferRepository>,
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    confirm: Arc<ConfirmPaymentHandler>,
    prefixes: BasketPrefixes,
}

impl ChargeRecurringHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        offers: Arc<dyn OfferRepository>,
        transactions: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        confirm: Arc<ConfirmPaymentHandler>,
        prefixes: BasketPrefixes,
    ) -> Self {
        Self {
            contracts,
            offers,
            transactions,
            gateway,
            confirm,
            prefixes,
        }
    }

    pub async fn handle(
        &self,
        command: ChargeRecurringCommand,
    ) -> Result<RecurringChargeResult, DomainError> {
        let contract = self
            .contracts
            .find_by_id(&command.contract_id)
            .await?
            .ok_or_else(|| DomainError::contract_not_found(command.contract_id))?;

        if contract.status != ContractStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot bill a {:?} contract", contract.status),
            ));
        }
        let instrument_token = contract.instrument_token.clone().ok_or_else(|| {
            DomainError::validation(
                "instrument_token",
                "Contract has no stored credential; use the card-verified charge flow",
            )
        })?;
        let offer = self
            .offers
            .find_by_id(&contract.offer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OfferNotFound,
                    format!("Offer not found: {}", contract.offer_id),
                )
            })?;

        let basket_id = BasketId::generate(ChargeKind::Recurring, &self.prefixes);
        let transaction = Transaction::new(
            contract.id,
            basket_id.clone(),
            ChargeKind::Recurring,
            contract.amount,
            offer.child_name.clone(),
        );
        self.transactions.save(&transaction).await?;

        info!(
            contract_id = %contract.id,
            basket_id = %basket_id,
            amount = %contract.amount,
            "Issuing recurring charge"
        );

        let outcome = match self
            .gateway
            .charge_stored_instrument(RecurringChargeRequest {
                instrument_token,
                basket_id: basket_id.clone(),
                amount: contract.amount,
                customer: command.customer,
            })
            .await
        {
            Ok(outcome) => outcome,
            Err(err) if err.is_indeterminate() => {
                warn!(
                    contract_id = %contract.id,
                    basket_id = %basket_id,
                    error = %err,
                    "Recurring charge outcome unknown; leaving for reconciliation"
                );
                return Ok(RecurringChargeResult::Pending);
            }
            // Fatal before the charge could be attempted (e.g. token
            // acquisition). The pending row is resolved by reconciliation.
            Err(err) => return Err(err.into()),
        };

        if outcome.approved {
            let invoice_id = outcome.invoice_id.ok_or_else(|| {
                DomainError::new(
                    ErrorCode::GatewayError,
                    "Approved charge response is missing its invoice id",
                )
            })?;
            self.confirm
                .handle(ConfirmPaymentCommand {
                    basket_id,
                    invoice_id,
                    amount: contract.amount,
                    instrument_token: outcome.instrument_token,
                })
                .await?;
            Ok(RecurringChargeResult::Confirmed)
        } else {
            let result = self
                .confirm
                .record_failure(
                    &basket_id,
                    &outcome.err_code,
                    &outcome.err_msg,
                    outcome.invoice_id,
                )
                .await?;
            let suspended = matches!(
                result,
                PaymentFailureResult::Recorded { suspended: true, .. }
            );
            Ok(RecurringChargeResult::Failed { suspended })
        }
    }
}
