//! The single payment-confirmation entry point.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::application::handlers::session::SessionProvisioner;
use crate::application::locks::ContractLocks;
use crate::domain::contract::{Contract, ContractStatus, PaymentConfirmation};
use crate::domain::foundation::{Amount, ContractId, DomainError, ErrorCode, Timestamp};
use crate::domain::payment::{BasketId, ChargeKind, Transaction};
use crate::ports::{
    BalanceLedger, ContractRepository, Notification, Notifier, TransactionRepository,
};

/// A settled charge, however it was learned about.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    /// Basket id correlating the charge to its transaction row.
    pub basket_id: BasketId,

    /// Gateway transaction id.
    pub invoice_id: String,

    /// Settled amount.
    pub amount: Amount,

    /// Stored-credential token, if the gateway enabled recurring billing.
    pub instrument_token: Option<String>,
}

/// Outcome of a confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPaymentResult {
    /// This call applied the payment.
    Confirmed {
        contract_id: ContractId,
        first_payment: bool,
    },

    /// The transaction was already settled; nothing changed.
    AlreadyConfirmed { contract_id: ContractId },
}

/// Outcome of recording a failed charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentFailureResult {
    /// The failure was recorded. `suspended` is true when it was the third
    /// consecutive recurring failure and the contract expired.
    Recorded {
        contract_id: ContractId,
        suspended: bool,
    },

    /// The transaction was already settled or failed; nothing changed.
    AlreadyResolved { contract_id: ContractId },
}

/// Applies confirmed and failed charges to the ledger.
///
/// Every producer of payment outcomes - the notification handler, the
/// synchronous recurring and step-up paths, and the reconciliation loop -
/// goes through this handler. Idempotence comes from re-reading the
/// transaction under the contract lock: a settled row short-circuits before
/// any mutation, so duplicate notifications and overlapping reconciliation
/// passes are harmless.
pub struct ConfirmPaymentHandler {
    contracts: Arc<dyn ContractRepository>,
    transactions: Arc<dyn TransactionRepository>,
    ledger: Arc<dyn BalanceLedger>,
    notifier: Arc<dyn Notifier>,
    provisioner: Arc<SessionProvisioner>,
    locks: Arc<ContractLocks>,
}

impl ConfirmPaymentHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        transactions: Arc<dyn TransactionRepository>,
        ledger: Arc<dyn BalanceLedger>,
        notifier: Arc<dyn Notifier>,
        provisioner: Arc<SessionProvisioner>,
        locks: Arc<ContractLocks>,
    ) -> Self {
        Self {
            contracts,
            transactions,
            ledger,
            notifier,
            provisioner,
            locks,
        }
    }

    /// Applies a settled charge.
    pub async fn handle(
        &self,
        command: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, DomainError> {
        let contract_id = self.contract_id_for(&command.basket_id).await?;
        let _guard = self.locks.acquire(&contract_id).await;

        // Re-read under the lock; a concurrent confirmation may have won.
        let mut transaction = self.expect_transaction(&command.basket_id).await?;
        if !transaction.is_pending() {
            return Ok(ConfirmPaymentResult::AlreadyConfirmed {
                contract_id: transaction.contract_id,
            });
        }

        let mut contract = self.expect_contract(&transaction.contract_id).await?;
        let first_payment = contract.status == ContractStatus::Created;

        if command.amount != transaction.amount {
            warn!(
                basket_id = %command.basket_id,
                expected = %transaction.amount,
                settled = %command.amount,
                "Settled amount differs from the issued charge; recording the settled amount"
            );
        }

        transaction.mark_paid(&command.invoice_id)?;
        let confirmation = PaymentConfirmation {
            amount: command.amount,
            paid_at: Timestamp::now(),
            instrument_token: command.instrument_token.clone(),
        };
        contract.record_payment(&confirmation)?;

        // Side effects run before the transaction row is marked paid. If any
        // of them fails the row stays pending, so the next notification or
        // reconciliation pass retries the whole confirmation instead of
        // short-circuiting on a settled row. Month provisioning is
        // idempotent, and the credit sits closest to the status write to
        // keep the double-apply window small.
        self.provisioner
            .ensure_month(&contract, &confirmation.paid_at.month_key())
            .await?;
        self.ledger.credit(&contract.tutor_id, command.amount).await?;
        self.transactions
            .record_tutor_earning(&contract.tutor_id, &contract.id, command.amount)
            .await?;

        self.transactions.update(&transaction).await?;
        self.contracts.update(&contract).await?;

        info!(
            contract_id = %contract.id,
            basket_id = %command.basket_id,
            invoice_id = %command.invoice_id,
            amount = %command.amount,
            first_payment,
            "Payment confirmed"
        );
        self.fan_out_confirmation(&contract, first_payment).await;

        Ok(ConfirmPaymentResult::Confirmed {
            contract_id: contract.id,
            first_payment,
        })
    }

    /// Records a definitively failed charge.
    pub async fn record_failure(
        &self,
        basket_id: &BasketId,
        err_code: &str,
        err_msg: &str,
        invoice_id: Option<String>,
    ) -> Result<PaymentFailureResult, DomainError> {
        let contract_id = self.contract_id_for(basket_id).await?;
        let _guard = self.locks.acquire(&contract_id).await;

        let mut transaction = self.expect_transaction(basket_id).await?;
        if !transaction.is_pending() {
            return Ok(PaymentFailureResult::AlreadyResolved {
                contract_id: transaction.contract_id,
            });
        }

        transaction.mark_failed(invoice_id)?;
        self.transactions.update(&transaction).await?;

        warn!(
            contract_id = %transaction.contract_id,
            basket_id = %basket_id,
            charge_kind = ?transaction.charge_kind,
            err_code,
            err_msg,
            "Charge failed"
        );

        let mut contract = self.expect_contract(&transaction.contract_id).await?;
        let suspended = match transaction.charge_kind {
            // A failed first charge leaves the contract in Created; the payer
            // can retry checkout against a fresh basket.
            ChargeKind::Initial => false,
            ChargeKind::Recurring => {
                if contract.status == ContractStatus::Active {
                    let expired = contract.record_recurring_failure()?;
                    self.contracts.update(&contract).await?;
                    expired
                } else {
                    false
                }
            }
        };

        self.fan_out_failure(&contract, &transaction, suspended).await;

        Ok(PaymentFailureResult::Recorded {
            contract_id: contract.id,
            suspended,
        })
    }

    async fn contract_id_for(&self, basket_id: &BasketId) -> Result<ContractId, DomainError> {
        Ok(self.expect_transaction(basket_id).await?.contract_id)
    }

    async fn expect_transaction(&self, basket_id: &BasketId) -> Result<Transaction, DomainError> {
        self.transactions
            .find_by_basket_id(basket_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::TransactionNotFound,
                    format!("No transaction for basket id {}", basket_id),
                )
            })
    }

    async fn expect_contract(&self, contract_id: &ContractId) -> Result<Contract, DomainError> {
        self.contracts
            .find_by_id(contract_id)
            .await?
            .ok_or_else(|| DomainError::contract_not_found(contract_id))
    }

    async fn fan_out_confirmation(&self, contract: &Contract, first_payment: bool) {
        let data = json!({ "contract_id": contract.id });
        let parent_body = if first_payment {
            "Your subscription is active. Sessions for this month are scheduled."
        } else {
            "This month's tuition payment went through."
        };
        self.notifier
            .notify(
                Notification::new(contract.parent_id.clone(), "Payment received", parent_body)
                    .with_data(data.clone()),
            )
            .await;
        self.notifier
            .notify(
                Notification::new(
                    contract.tutor_id.clone(),
                    "Payment received",
                    format!("{} has been credited to your balance", contract.amount),
                )
                .with_data(data),
            )
            .await;
    }

    async fn fan_out_failure(
        &self,
        contract: &Contract,
        transaction: &Transaction,
        suspended: bool,
    ) {
        let data = json!({ "contract_id": contract.id, "basket_id": transaction.basket_id });
        if suspended {
            self.notifier
                .notify(
                    Notification::new(
                        contract.parent_id.clone(),
                        "Subscription suspended",
                        "Three payment attempts failed and your subscription is suspended. \
                         Please update your card to continue.",
                    )
                    .with_data(data.clone()),
                )
                .await;
            self.notifier
                .notify(
                    Notification::new(
                        contract.tutor_id.clone(),
                        "Subscription suspended",
                        "A contract was suspended after repeated payment failures",
                    )
                    .with_data(data),
                )
                .await;
        } else {
            self.notifier
                .notify(
                    Notification::new(
                        contract.parent_id.clone(),
                        "Payment failed",
                        "A tuition payment did not go through. We will retry, or you can pay \
                         manually from the app.",
                    )
                    .with_data(data),
                )
                .await;
        }
    }
}
