//! Contract aggregate entity.
//!
//! The Contract is the billed relationship created when an offer is
//! accepted. It is the only place subscription status changes, and it
//! carries the payment bookkeeping that the confirmation and recurring
//! charge paths depend on.
//!
//! # Design Decisions
//!
//! - **Money in minor units**: all amounts are i64 minor units
//! - **Never hard-deleted**: contracts end by reaching a terminal status
//! - **3-strikes suspension**: failure accumulation is state, not an error path

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Amount, ContractId, DomainError, ErrorCode, OfferId, StateMachine, Timestamp, UserId,
};

use super::ContractStatus;

/// Consecutive recurring failures that suspend the contract.
pub const MAX_RECURRING_FAILURES: u32 = 3;

/// Details of a confirmed gateway payment, applied to the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Amount the gateway settled.
    pub amount: Amount,

    /// When the payment was confirmed.
    pub paid_at: Timestamp,

    /// Stored-credential token, if the gateway returned one.
    pub instrument_token: Option<String>,
}

/// Contract aggregate - the billed parent/tutor relationship.
///
/// # Invariants
///
/// - Status only moves along [`ContractStatus`] edges
/// - At most one live contract per offer (enforced by the ledger handlers)
/// - `failure_count` resets to 0 on any confirmed payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier.
    pub id: ContractId,

    /// Offer this contract fulfils.
    pub offer_id: OfferId,

    /// Paying party.
    pub parent_id: UserId,

    /// Earning party.
    pub tutor_id: UserId,

    /// Gateway correlation key of the first charge.
    pub basket_id: String,

    /// Current lifecycle status.
    pub status: ContractStatus,

    /// Opaque stored-credential reference, present only after a successful
    /// recurring-enabled charge.
    pub instrument_token: Option<String>,

    /// When the next recurring charge is due.
    pub next_billing_date: Option<Timestamp>,

    /// When the last payment was confirmed.
    pub last_payment_date: Option<Timestamp>,

    /// Amount of the last confirmed payment.
    pub last_payment_amount: Option<Amount>,

    /// Consecutive recurring-charge failures since the last success.
    pub failure_count: u32,

    /// Monthly billing amount.
    pub amount: Amount,

    /// When the contract started (first activation).
    pub start_date: Option<Timestamp>,

    /// When the contract reached a terminal state.
    pub end_date: Option<Timestamp>,

    /// Reason given when disputed.
    pub dispute_reason: Option<String>,

    /// Party who raised the dispute.
    pub disputed_by: Option<UserId>,

    /// When the dispute was raised.
    pub disputed_at: Option<Timestamp>,

    /// When the contract row was created.
    pub created_at: Timestamp,

    /// When the contract row was last updated.
    pub updated_at: Timestamp,
}

impl Contract {
    /// Creates a new contract in `Created` state for an accepted offer.
    pub fn new(
        id: ContractId,
        offer_id: OfferId,
        parent_id: UserId,
        tutor_id: UserId,
        basket_id: impl Into<String>,
        amount: Amount,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            offer_id,
            parent_id,
            tutor_id,
            basket_id: basket_id.into(),
            status: ContractStatus::Created,
            instrument_token: None,
            next_billing_date: None,
            last_payment_date: None,
            last_payment_amount: None,
            failure_count: 0,
            amount,
            start_date: None,
            end_date: None,
            dispute_reason: None,
            disputed_by: None,
            disputed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a confirmed payment (first or recurring).
    ///
    /// On the first confirmation the contract flips `Created -> Active` and
    /// records its start date. Every confirmation stores the payment
    /// bookkeeping, advances the billing date one calendar month, resets the
    /// failure counter, and persists the instrument token if one arrived.
    ///
    /// Idempotent re-confirmation of an already-`Active` contract is the
    /// caller's concern (the confirm-payment entry point checks the
    /// transaction status first); calling this on a terminal contract fails.
    pub fn record_payment(&mut self, confirmation: &PaymentConfirmation) -> Result<(), DomainError> {
        match self.status {
            ContractStatus::Created => {
                self.status = self.transition(ContractStatus::Active)?;
                self.start_date = Some(confirmation.paid_at);
            }
            ContractStatus::Active => {}
            _ => {
                return Err(DomainError::new(
                    ErrorCode::ContractTerminal,
                    format!("Cannot record a payment on a {:?} contract", self.status),
                ))
            }
        }

        if let Some(token) = &confirmation.instrument_token {
            self.instrument_token = Some(token.clone());
        }
        self.last_payment_date = Some(confirmation.paid_at);
        self.last_payment_amount = Some(confirmation.amount);
        self.next_billing_date = Some(confirmation.paid_at.add_months(1));
        self.failure_count = 0;
        self.touch();
        Ok(())
    }

    /// Records a failed recurring charge.
    ///
    /// Returns `true` if this failure was the third consecutive one and the
    /// contract is now `Expired` (payment-suspended).
    pub fn record_recurring_failure(&mut self) -> Result<bool, DomainError> {
        if self.status != ContractStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Recurring failures only apply to active contracts, not {:?}",
                    self.status
                ),
            ));
        }
        self.failure_count += 1;
        if self.failure_count >= MAX_RECURRING_FAILURES {
            self.status = self.transition(ContractStatus::Expired)?;
            self.end_date = Some(Timestamp::now());
            self.touch();
            return Ok(true);
        }
        self.touch();
        Ok(false)
    }

    /// Cancels the contract (explicit action by either party).
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.status = self.transition(ContractStatus::Cancelled)?;
        self.end_date = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Raises a dispute with a mandatory non-empty reason.
    pub fn dispute(&mut self, actor: &UserId, reason: &str) -> Result<(), DomainError> {
        if reason.trim().is_empty() {
            return Err(DomainError::validation(
                "reason",
                "A dispute requires a non-empty reason",
            ));
        }
        self.ensure_party(actor)?;
        self.status = self.transition(ContractStatus::Dispute)?;
        let now = Timestamp::now();
        self.dispute_reason = Some(reason.trim().to_string());
        self.disputed_by = Some(actor.clone());
        self.disputed_at = Some(now);
        self.end_date = Some(now);
        self.touch();
        Ok(())
    }

    /// Marks the work finished, opening the dual-rating window.
    pub fn request_completion(&mut self, actor: &UserId) -> Result<(), DomainError> {
        self.ensure_party(actor)?;
        self.status = self.transition(ContractStatus::PendingCompletion)?;
        self.touch();
        Ok(())
    }

    /// Closes the contract once both parties have rated.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.status = self.transition(ContractStatus::Completed)?;
        self.end_date = Some(Timestamp::now());
        self.touch();
        Ok(())
    }

    /// Returns the counter-party of `actor`.
    pub fn counterparty(&self, actor: &UserId) -> Result<UserId, DomainError> {
        if actor == &self.parent_id {
            Ok(self.tutor_id.clone())
        } else if actor == &self.tutor_id {
            Ok(self.parent_id.clone())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                "User is not a party to this contract",
            ))
        }
    }

    fn ensure_party(&self, actor: &UserId) -> Result<(), DomainError> {
        self.counterparty(actor).map(|_| ())
    }

    fn transition(&self, target: ContractStatus) -> Result<ContractStatus, DomainError> {
        self.status.transition_to(target).map_err(|_| {
            let code = if self.status.is_terminal() {
                ErrorCode::ContractTerminal
            } else {
                ErrorCode::InvalidStateTransition
            };
            DomainError::new(
                code,
                format!(
                    "Cannot transition contract from {:?} to {:?}",
                    self.status, target
                ),
            )
        })
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> UserId {
        UserId::new("parent-1").unwrap()
    }

    fn tutor() -> UserId {
        UserId::new("tutor-1").unwrap()
    }

    fn contract() -> Contract {
        Contract::new(
            ContractId::new(),
            OfferId::new(),
            parent(),
            tutor(),
            "SUB-abc123",
            Amount::from_minor_units(500000).unwrap(),
        )
    }

    fn confirmation(token: Option<&str>) -> PaymentConfirmation {
        PaymentConfirmation {
            amount: Amount::from_minor_units(500000).unwrap(),
            paid_at: Timestamp::now(),
            instrument_token: token.map(String::from),
        }
    }

    fn active_contract() -> Contract {
        let mut c = contract();
        c.record_payment(&confirmation(Some("tok_1"))).unwrap();
        c
    }

    #[test]
    fn first_payment_activates_and_books_billing_date() {
        let mut c = contract();
        let conf = confirmation(Some("tok_1"));
        c.record_payment(&conf).unwrap();

        assert_eq!(c.status, ContractStatus::Active);
        assert_eq!(c.instrument_token.as_deref(), Some("tok_1"));
        assert_eq!(c.last_payment_amount, Some(conf.amount));
        assert_eq!(c.next_billing_date, Some(conf.paid_at.add_months(1)));
        assert_eq!(c.failure_count, 0);
        assert!(c.start_date.is_some());
    }

    #[test]
    fn recurring_payment_keeps_existing_token_when_none_returned() {
        let mut c = active_contract();
        c.record_payment(&confirmation(None)).unwrap();
        assert_eq!(c.instrument_token.as_deref(), Some("tok_1"));
    }

    #[test]
    fn payment_resets_failure_count() {
        let mut c = active_contract();
        c.record_recurring_failure().unwrap();
        c.record_recurring_failure().unwrap();
        assert_eq!(c.failure_count, 2);

        c.record_payment(&confirmation(None)).unwrap();
        assert_eq!(c.failure_count, 0);
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn third_consecutive_failure_expires() {
        let mut c = active_contract();
        assert!(!c.record_recurring_failure().unwrap());
        assert!(!c.record_recurring_failure().unwrap());
        assert!(c.record_recurring_failure().unwrap());

        assert_eq!(c.status, ContractStatus::Expired);
        assert_eq!(c.failure_count, 3);
        assert!(c.end_date.is_some());
    }

    #[test]
    fn fourth_attempt_rejected_after_expiry() {
        let mut c = active_contract();
        for _ in 0..3 {
            c.record_recurring_failure().unwrap();
        }
        assert!(c.record_recurring_failure().is_err());
        assert!(c.record_payment(&confirmation(None)).is_err());
    }

    #[test]
    fn dispute_requires_reason() {
        let mut c = active_contract();
        let err = c.dispute(&parent(), "   ").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(c.status, ContractStatus::Active);
    }

    #[test]
    fn dispute_records_actor_and_reason() {
        let mut c = active_contract();
        c.dispute(&parent(), "refund needed").unwrap();
        assert_eq!(c.status, ContractStatus::Dispute);
        assert_eq!(c.dispute_reason.as_deref(), Some("refund needed"));
        assert_eq!(c.disputed_by, Some(parent()));
        assert!(c.disputed_at.is_some());
    }

    #[test]
    fn disputed_contract_is_frozen() {
        let mut c = active_contract();
        c.dispute(&tutor(), "sessions not delivered").unwrap();
        assert!(c.cancel().is_err());
        assert!(c.request_completion(&parent()).is_err());
        assert!(c.record_payment(&confirmation(None)).is_err());
    }

    #[test]
    fn stranger_cannot_dispute() {
        let mut c = active_contract();
        let outsider = UserId::new("someone-else").unwrap();
        let err = c.dispute(&outsider, "not mine").unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[test]
    fn completion_flow_reaches_terminal() {
        let mut c = active_contract();
        c.request_completion(&parent()).unwrap();
        assert_eq!(c.status, ContractStatus::PendingCompletion);
        c.complete().unwrap();
        assert_eq!(c.status, ContractStatus::Completed);
        assert!(c.complete().is_err());
    }

    #[test]
    fn payment_on_created_contract_only_after_gateway_confirms() {
        let mut c = contract();
        assert!(c.record_recurring_failure().is_err());
        assert_eq!(c.status, ContractStatus::Created);
    }

    #[test]
    fn counterparty_resolution() {
        let c = contract();
        assert_eq!(c.counterparty(&parent()).unwrap(), tutor());
        assert_eq!(c.counterparty(&tutor()).unwrap(), parent());
        assert!(c.counterparty(&UserId::new("x").unwrap()).is_err());
    }
}
