//! Manual card-verified recurring charge (two-phase step-up).
//!
//! Used when a contract is due but has no stored credential, or the payer
//! wants to pay with a different card. Phase one submits the chosen
//! instrument with its CVV; the gateway may approve outright or issue an
//! OTP / 3-D-Secure challenge that phase two answers.

use std::sync::Arc;

use tracing::info;

use crate::domain::contract::ContractStatus;
use crate::domain::foundation::{ContractId, DomainError, ErrorCode};
use crate::domain::payment::{BasketId, BasketPrefixes, ChargeKind, Transaction};
use crate::ports::{
    ChallengeData, ChallengeProof, ChargeOutcome, CompleteStepUpRequest, ContractRepository,
    CustomerContact, OfferRepository, PaymentGateway, StepUpChargeRequest, TransactionRepository,
};

use super::{ConfirmPaymentCommand, ConfirmPaymentHandler, PaymentFailureResult};

/// Phase-one request: charge a user-chosen card.
#[derive(Debug, Clone)]
pub struct StartStepUpCommand {
    pub contract_id: ContractId,
    pub instrument_token: String,
    pub cvv: String,
    pub customer: CustomerContact,
}

/// Phase-one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartStepUpResult {
    /// The payer must answer a challenge; complete with the returned ids.
    Challenged {
        basket_id: BasketId,
        gateway_transaction_id: String,
        challenge: ChallengeData,
    },

    /// Approved without a challenge and applied.
    Confirmed,

    /// Declined outright.
    Declined { suspended: bool },
}

/// Phase-two request: answer the challenge.
#[derive(Debug, Clone)]
pub struct CompleteStepUpCommand {
    pub basket_id: BasketId,
    pub gateway_transaction_id: String,
    pub proof: ChallengeProof,
}

/// Phase-two outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompleteStepUpResult {
    Confirmed,
    Declined { suspended: bool },
}

pub struct StepUpChargeHandler {
    contracts: Arc<dyn ContractRepository>,
    offers: Arc<dyn OfferRepository>,
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    confirm: Arc<ConfirmPaymentHandler>,
    prefixes: BasketPrefixes,
}

impl StepUpChargeHandler {
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

    /// Phase one: submit the card and CVV.
    pub async fn start(
        &self,
        command: StartStepUpCommand,
    ) -> Result<StartStepUpResult, DomainError> {
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

        let start = self
            .gateway
            .start_step_up_charge(StepUpChargeRequest {
                instrument_token: command.instrument_token,
                cvv: command.cvv,
                basket_id: basket_id.clone(),
                amount: contract.amount,
                customer: command.customer,
            })
            .await?;

        if let Some(challenge) = start.challenge {
            info!(
                contract_id = %contract.id,
                basket_id = %basket_id,
                gateway_transaction_id = %start.gateway_transaction_id,
                "Step-up charge challenged"
            );
            return Ok(StartStepUpResult::Challenged {
                basket_id,
                gateway_transaction_id: start.gateway_transaction_id,
                challenge,
            });
        }

        let outcome = start.outcome.ok_or_else(|| {
            DomainError::new(
                ErrorCode::GatewayError,
                "Step-up response has neither a challenge nor an outcome",
            )
        })?;
        match self.apply_outcome(&basket_id, contract.amount, outcome).await? {
            CompleteStepUpResult::Confirmed => Ok(StartStepUpResult::Confirmed),
            CompleteStepUpResult::Declined { suspended } => {
                Ok(StartStepUpResult::Declined { suspended })
            }
        }
    }

    /// Phase two: answer the challenge.
    pub async fn complete(
        &self,
        command: CompleteStepUpCommand,
    ) -> Result<CompleteStepUpResult, DomainError> {
        let transaction = self
            .transactions
            .find_by_basket_id(&command.basket_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TransactionNotFound,
                    format!("No transaction for basket id {}", command.basket_id),
                )
            })?;

        let outcome = self
            .gateway
            .complete_step_up_charge(CompleteStepUpRequest {
                basket_id: command.basket_id.clone(),
                amount: transaction.amount,
                gateway_transaction_id: command.gateway_transaction_id,
                proof: command.proof,
            })
            .await?;
        self.apply_outcome(&command.basket_id, transaction.amount, outcome)
            .await
    }

    async fn apply_outcome(
        &self,
        basket_id: &BasketId,
        amount: crate::domain::foundation::Amount,
        outcome: ChargeOutcome,
    ) -> Result<CompleteStepUpResult, DomainError> {
        if outcome.approved {
            let invoice_id = outcome.invoice_id.ok_or_else(|| {
                DomainError::new(
                    ErrorCode::GatewayError,
                    "Approved charge response is missing its invoice id",
                )
            })?;
            self.confirm
                .handle(ConfirmPaymentCommand {
                    basket_id: basket_id.clone(),
                    invoice_id,
                    amount,
                    instrument_token: outcome.instrument_token,
                })
                .await?;
            Ok(CompleteStepUpResult::Confirmed)
        } else {
            let result = self
                .confirm
                .record_failure(
                    basket_id,
                    &outcome.err_code,
                    &outcome.err_msg,
                    outcome.invoice_id,
                )
                .await?;
            let suspended = matches!(
                result,
                PaymentFailureResult::Recorded { suspended: true, .. }
            );
            Ok(CompleteStepUpResult::Declined { suspended })
        }
    }
}
