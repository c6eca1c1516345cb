//! Payment gateway port.
//!
//! Contract for the external payment processor integration: first charges
//! through a hosted checkout, off-session recurring charges against a stored
//! credential, the manual two-phase step-up (CVV + OTP / 3-D-Secure) flow,
//! and authoritative status queries used by reconciliation.
//!
//! # Failure semantics
//!
//! Token acquisition failure and signature mismatch are fatal to the current
//! operation and must not be retried silently. A timed-out charge is
//! indeterminate: the caller leaves the transaction pending for the
//! reconciliation loop rather than treating it as failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{Amount, ContractId, DomainError, ErrorCode};
use crate::domain::payment::BasketId;

/// Port for the external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// First payment for a contract. Requests recurring-capable instrument
    /// storage and returns the hosted-checkout redirect with signed form
    /// fields.
    async fn initiate_charge(
        &self,
        request: InitiateChargeRequest,
    ) -> Result<HostedCheckout, GatewayError>;

    /// Off-session recurring charge against a stored credential.
    async fn charge_stored_instrument(
        &self,
        request: RecurringChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError>;

    /// Lists the credentials the gateway has stored for a customer, used to
    /// resolve a user-chosen card when no instrument token is persisted on
    /// the contract yet.
    async fn list_stored_instruments(
        &self,
        customer_mobile: &str,
    ) -> Result<Vec<StoredInstrument>, GatewayError>;

    /// Phase one of a manual recurring charge requiring card verification.
    /// May come back approved outright or with a challenge to complete.
    async fn start_step_up_charge(
        &self,
        request: StepUpChargeRequest,
    ) -> Result<StepUpStart, GatewayError>;

    /// Phase two: answers the challenge with an OTP or 3-D-Secure proof.
    async fn complete_step_up_charge(
        &self,
        request: CompleteStepUpRequest,
    ) -> Result<ChargeOutcome, GatewayError>;

    /// Authoritative status of a previously issued charge. Reconciliation
    /// calls this for transactions stuck in the pending state. The amount is
    /// the issued charge amount; gateway access tokens are scoped to the
    /// `(basket id, amount)` pair.
    async fn fetch_charge_status(
        &self,
        basket_id: &BasketId,
        amount: Amount,
    ) -> Result<RemoteChargeStatus, GatewayError>;
}

/// Customer contact details forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    /// Customer email, optional on the wire.
    pub email: Option<String>,

    /// Customer mobile number; also the stored-instrument lookup key.
    pub mobile: String,
}

/// Request for a first, recurring-enabled charge.
#[derive(Debug, Clone)]
pub struct InitiateChargeRequest {
    /// Contract being billed.
    pub contract_id: ContractId,

    /// Pre-generated basket id (initial-charge class).
    pub basket_id: BasketId,

    /// Amount to charge.
    pub amount: Amount,

    /// Order description shown at checkout.
    pub description: String,

    /// Customer contact details.
    pub customer: CustomerContact,
}

/// Hosted-checkout handle returned for a first charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedCheckout {
    /// URL the payer is redirected to.
    pub redirect_url: String,

    /// Signed form fields posted to the gateway.
    pub form_fields: Vec<(String, String)>,

    /// Basket id correlating the eventual notification.
    pub basket_id: BasketId,
}

/// Request for an off-session stored-credential charge.
#[derive(Debug, Clone)]
pub struct RecurringChargeRequest {
    /// Stored-credential reference from the contract.
    pub instrument_token: String,

    /// Pre-generated basket id (recurring-charge class).
    pub basket_id: BasketId,

    /// Amount to charge.
    pub amount: Amount,

    /// Customer contact details.
    pub customer: CustomerContact,
}

/// Synchronous outcome of a charge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    /// True if the gateway approved the charge.
    pub approved: bool,

    /// Gateway transaction id.
    pub invoice_id: Option<String>,

    /// Gateway error code (`"000"` on success).
    pub err_code: String,

    /// Gateway status message.
    pub err_msg: String,

    /// Stored-credential token, when the gateway tokenized the card.
    pub instrument_token: Option<String>,
}

/// A credential the gateway has stored for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredInstrument {
    /// Opaque token to charge against.
    pub token: String,

    /// Masked card number for display.
    pub masked_pan: String,

    /// Card scheme (e.g. VISA).
    pub scheme: String,
}

/// Request to start a manual, card-verified recurring charge.
#[derive(Debug, Clone)]
pub struct StepUpChargeRequest {
    /// Instrument chosen by the user.
    pub instrument_token: String,

    /// Card verification value entered by the user.
    pub cvv: String,

    /// Pre-generated basket id (recurring-charge class).
    pub basket_id: BasketId,

    /// Amount to charge.
    pub amount: Amount,

    /// Customer contact details.
    pub customer: CustomerContact,
}

/// Result of step-up phase one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpStart {
    /// Gateway transaction id to complete against.
    pub gateway_transaction_id: String,

    /// Challenge the payer must answer, absent if the card approved
    /// without one.
    pub challenge: Option<ChallengeData>,

    /// Outcome when no challenge was required.
    pub outcome: Option<ChargeOutcome>,
}

/// Challenge issued by the card network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChallengeData {
    /// One-time code sent to the cardholder.
    Otp,

    /// 3-D-Secure redirect challenge.
    ThreeDs { acs_url: String, pareq: String },
}

/// Request to finish a challenged step-up charge.
#[derive(Debug, Clone)]
pub struct CompleteStepUpRequest {
    /// Basket id of the charge being completed.
    pub basket_id: BasketId,

    /// Amount of the issued charge.
    pub amount: Amount,

    /// Gateway transaction id from phase one.
    pub gateway_transaction_id: String,

    /// Payer's answer to the challenge.
    pub proof: ChallengeProof,
}

/// Payer's answer to a step-up challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeProof {
    /// One-time code.
    Otp(String),

    /// 3-D-Secure authentication proof.
    ThreeDs(String),
}

/// Authoritative charge status from the gateway's query API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RemoteChargeStatus {
    /// Settled.
    Paid {
        invoice_id: String,
        amount_minor_units: i64,
        instrument_token: Option<String>,
    },

    /// Definitively failed.
    Failed { err_code: String, err_msg: String },

    /// Still in flight at the gateway.
    Pending,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Access-token acquisition failed. Fatal to the operation.
    #[error("Gateway token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// Network-level failure talking to the gateway.
    #[error("Gateway network error: {0}")]
    Network(String),

    /// The call exceeded its timeout; outcome indeterminate.
    #[error("Gateway request timed out after {0} seconds")]
    Timeout(u64),

    /// Gateway rejected the request.
    #[error("Gateway rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    /// Response could not be parsed.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// True if the outcome of the attempted charge is unknown and must be
    /// left for reconciliation rather than recorded as a failure.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, GatewayError::Timeout(_) | GatewayError::Network(_))
    }
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        DomainError::new(ErrorCode::GatewayError, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_gateway_is_object_safe() {
        fn _accepts_dyn(_gateway: &dyn PaymentGateway) {}
    }

    #[test]
    fn timeouts_and_network_errors_are_indeterminate() {
        assert!(GatewayError::Timeout(30).is_indeterminate());
        assert!(GatewayError::Network("reset".into()).is_indeterminate());
        assert!(!GatewayError::TokenAcquisition("401".into()).is_indeterminate());
        assert!(!GatewayError::Rejected {
            code: "097".into(),
            message: "declined".into()
        }
        .is_indeterminate());
    }

    #[test]
    fn gateway_error_converts_to_domain_error() {
        let err: DomainError = GatewayError::TokenAcquisition("401".into()).into();
        assert_eq!(err.code, ErrorCode::GatewayError);
    }
}
