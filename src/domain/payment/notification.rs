//! Inbound gateway notification wire format.

use serde::{Deserialize, Serialize};

/// Error code the gateway sends for a successful payment.
pub const GATEWAY_SUCCESS_CODE: &str = "000";

/// A payment notification pushed by the gateway.
///
/// Field names follow the gateway's wire format. The `validation_hash` must
/// match the locally computed digest before anything else is looked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayNotification {
    /// Correlates to `Transaction.basket_id`.
    pub basket_id: String,

    /// `"000"` means success; anything else is a failure.
    pub err_code: String,

    /// Gateway's human-readable status message.
    #[serde(default)]
    pub err_msg: String,

    /// Gateway transaction id, becomes `Transaction.invoice_id`.
    pub transaction_id: String,

    /// Settled amount in integer minor units.
    pub transaction_amount: i64,

    /// Digest over `basket_id|secret|merchant_id|err_code`.
    pub validation_hash: String,

    /// Stored-credential token, present when the gateway tokenized the card.
    #[serde(rename = "Instrument_token", default)]
    pub instrument_token: Option<String>,

    /// `"TRUE"` when the charge enabled recurring billing on the instrument.
    #[serde(default)]
    pub recurring_txn: Option<String>,
}

impl GatewayNotification {
    /// True if the gateway reports the payment as settled.
    pub fn is_success(&self) -> bool {
        self.err_code == GATEWAY_SUCCESS_CODE
    }

    /// True if the gateway stored a recurring-capable credential.
    pub fn recurring_enabled(&self) -> bool {
        self.recurring_txn
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("TRUE"))
            .unwrap_or(false)
    }

    /// Instrument token to persist, only when recurring billing was enabled.
    pub fn storable_instrument_token(&self) -> Option<&str> {
        if self.recurring_enabled() {
            self.instrument_token.as_deref()
        } else {
            None
        }
    }
}
