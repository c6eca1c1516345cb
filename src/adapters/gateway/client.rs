//! HTTP payment gateway client.
//!
//! Speaks the gateway's merchant API: access-token acquisition, the hosted
//! checkout form for first charges, direct stored-credential charges, the
//! two-phase step-up endpoints, and the status query reconciliation relies
//! on. All outbound requests are signed with the shared secret.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::domain::foundation::Amount;
use crate::domain::payment::{sign_request, BasketId, GATEWAY_SUCCESS_CODE};
use crate::ports::{
    ChallengeData, ChallengeProof, ChargeOutcome, CompleteStepUpRequest, GatewayError,
    HostedCheckout, InitiateChargeRequest, PaymentGateway, RecurringChargeRequest,
    RemoteChargeStatus, StepUpChargeRequest, StepUpStart, StoredInstrument,
};

/// Gateway tokens are valid for an hour; refresh with headroom.
const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);

/// Processing code sent on checkout charges.
const PROC_CODE: &str = "00";

/// Transaction type sent on hosted-checkout charges.
const CHECKOUT_TRANSACTION_TYPE: &str = "ECOMMERCE";

/// Tokens are issued per `(basket_id, amount)` pair; non-transactional calls
/// use the empty scope.
type TokenScope = (String, String);

struct CachedToken {
    value: String,
    acquired_at: Instant,
}

/// Form body for the token endpoint. The scope fields are included only for
/// transactional tokens.
fn token_request_form<'a>(
    merchant_id: &'a str,
    secured_key: &'a str,
    basket_id: &'a str,
    amount: &'a str,
) -> Vec<(&'a str, &'a str)> {
    let mut form = vec![("merchant_id", merchant_id), ("secured_key", secured_key)];
    if !basket_id.is_empty() {
        form.push(("basket_id", basket_id));
        form.push(("txnamt", amount));
    }
    form
}

pub struct HttpGatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
    tokens: Mutex<HashMap<TokenScope, CachedToken>>,
}

impl HttpGatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            http,
            config,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn transport_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.config.request_timeout_secs)
        } else {
            GatewayError::Network(err.to_string())
        }
    }

    /// Returns the access token for one `(basket_id, amount)` scope, fetching
    /// a fresh one when no live token exists for that pair. Tokens issued for
    /// one basket or amount are never reused for another.
    async fn access_token(&self, basket_id: &str, amount: &str) -> Result<String, GatewayError> {
        let scope: TokenScope = (basket_id.to_string(), amount.to_string());
        let mut cache = self.tokens.lock().await;
        cache.retain(|_, t| t.acquired_at.elapsed() < TOKEN_TTL);
        if let Some(cached) = cache.get(&scope) {
            return Ok(cached.value.clone());
        }

        debug!(basket_id, "Fetching fresh gateway access token");
        let form = token_request_form(
            self.config.merchant_id.as_str(),
            self.config.secret(),
            basket_id,
            amount,
        );
        let response = self
            .http
            .post(self.url("token"))
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::TokenAcquisition(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GatewayError::TokenAcquisition(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::TokenAcquisition(e.to_string()))?;

        cache.insert(
            scope,
            CachedToken {
                value: body.token.clone(),
                acquired_at: Instant::now(),
            },
        );
        Ok(body.token)
    }

    /// The signed hosted-checkout form. All fields participate in the
    /// alphabetically-sorted signature.
    fn checkout_form_fields(
        &self,
        request: &InitiateChargeRequest,
        token: String,
    ) -> Vec<(String, String)> {
        let amount = request.amount.to_decimal_string();
        let email = request.customer.email.clone().unwrap_or_default();

        let mut form_fields = vec![
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            ("merchant_name".to_string(), self.config.merchant_name.clone()),
            ("token".to_string(), token),
            ("basket_id".to_string(), request.basket_id.as_str().to_string()),
            ("txnamt".to_string(), amount),
            ("currency_code".to_string(), self.config.currency.clone()),
            (
                "order_date".to_string(),
                Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("order_description".to_string(), request.description.clone()),
            ("proccode".to_string(), PROC_CODE.to_string()),
            (
                "transaction_type".to_string(),
                CHECKOUT_TRANSACTION_TYPE.to_string(),
            ),
            ("customer_email_address".to_string(), email),
            ("customer_mobile_no".to_string(), request.customer.mobile.clone()),
            ("success_url".to_string(), self.config.success_url.clone()),
            ("failure_url".to_string(), self.config.failure_url.clone()),
            ("checkout_url".to_string(), self.config.checkout_url.clone()),
            // Asks the gateway to tokenize the card for off-session billing.
            ("recurring_txn".to_string(), "TRUE".to_string()),
        ];
        let borrowed: Vec<(&str, &str)> = form_fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let signature = sign_request(&borrowed, self.config.secret());
        form_fields.push(("signature".to_string(), signature));
        form_fields
    }

    async fn parse_charge_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ChargeOutcome, GatewayError> {
        if !response.status().is_success() {
            let code = response.status().as_u16().to_string();
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected { code, message });
        }
        let wire: ChargeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(wire.into_outcome())
    }
}

#[async_trait]
impl PaymentGateway for HttpGatewayClient {
    async fn initiate_charge(
        &self,
        request: InitiateChargeRequest,
    ) -> Result<HostedCheckout, GatewayError> {
        let amount = request.amount.to_decimal_string();
        let token = self
            .access_token(request.basket_id.as_str(), &amount)
            .await?;
        let form_fields = self.checkout_form_fields(&request, token);

        debug!(
            contract_id = %request.contract_id,
            basket_id = %request.basket_id,
            "Prepared hosted checkout"
        );
        Ok(HostedCheckout {
            redirect_url: self.url("transaction"),
            form_fields,
            basket_id: request.basket_id,
        })
    }

    async fn charge_stored_instrument(
        &self,
        request: RecurringChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        let amount = request.amount.to_decimal_string();
        let token = self
            .access_token(request.basket_id.as_str(), &amount)
            .await?;
        let signature = sign_request(
            &[
                ("basket_id", request.basket_id.as_str()),
                ("instrument_token", request.instrument_token.as_str()),
                ("merchant_id", self.config.merchant_id.as_str()),
                ("txnamt", amount.as_str()),
            ],
            self.config.secret(),
        );

        let response = self
            .http
            .post(self.url("transaction/recurring"))
            .bearer_auth(token)
            .form(&[
                ("merchant_id", self.config.merchant_id.as_str()),
                ("basket_id", request.basket_id.as_str()),
                ("txnamt", amount.as_str()),
                ("currency_code", self.config.currency.as_str()),
                ("instrument_token", request.instrument_token.as_str()),
                ("customer_mobile_no", request.customer.mobile.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_charge_response(response).await
    }

    async fn list_stored_instruments(
        &self,
        customer_mobile: &str,
    ) -> Result<Vec<StoredInstrument>, GatewayError> {
        // Instrument listing is not tied to a charge; the token carries the
        // empty scope.
        let token = self.access_token("", "").await?;
        let response = self
            .http
            .get(self.url("customer/instruments"))
            .bearer_auth(token)
            .query(&[("customer_mobile_no", customer_mobile)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !response.status().is_success() {
            return Err(GatewayError::Rejected {
                code: response.status().as_u16().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let wire: InstrumentListResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(wire
            .instruments
            .into_iter()
            .map(|i| StoredInstrument {
                token: i.instrument_token,
                masked_pan: i.card_mask,
                scheme: i.scheme,
            })
            .collect())
    }

    async fn start_step_up_charge(
        &self,
        request: StepUpChargeRequest,
    ) -> Result<StepUpStart, GatewayError> {
        let amount = request.amount.to_decimal_string();
        let token = self
            .access_token(request.basket_id.as_str(), &amount)
            .await?;
        let response = self
            .http
            .post(self.url("transaction/stepup"))
            .bearer_auth(token)
            .form(&[
                ("merchant_id", self.config.merchant_id.as_str()),
                ("basket_id", request.basket_id.as_str()),
                ("txnamt", amount.as_str()),
                ("currency_code", self.config.currency.as_str()),
                ("instrument_token", request.instrument_token.as_str()),
                ("cvv", request.cvv.as_str()),
                ("customer_mobile_no", request.customer.mobile.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !response.status().is_success() {
            return Err(GatewayError::Rejected {
                code: response.status().as_u16().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let wire: StepUpResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let challenge = match wire.challenge_type.as_deref() {
            Some("OTP") => Some(ChallengeData::Otp),
            Some("3DS") => {
                let acs_url = wire.acs_url.clone().ok_or_else(|| {
                    GatewayError::InvalidResponse("3DS challenge without acs_url".into())
                })?;
                let pareq = wire.pareq.clone().ok_or_else(|| {
                    GatewayError::InvalidResponse("3DS challenge without pareq".into())
                })?;
                Some(ChallengeData::ThreeDs { acs_url, pareq })
            }
            Some(other) => {
                warn!(challenge_type = other, "Unknown step-up challenge type");
                return Err(GatewayError::InvalidResponse(format!(
                    "unknown challenge type {}",
                    other
                )));
            }
            None => None,
        };

        let outcome = if challenge.is_none() {
            Some(wire.charge.into_outcome())
        } else {
            None
        };
        Ok(StepUpStart {
            gateway_transaction_id: wire.transaction_id,
            challenge,
            outcome,
        })
    }

    async fn complete_step_up_charge(
        &self,
        request: CompleteStepUpRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        let amount = request.amount.to_decimal_string();
        let token = self
            .access_token(request.basket_id.as_str(), &amount)
            .await?;
        let (proof_field, proof_value) = match &request.proof {
            ChallengeProof::Otp(code) => ("otp", code.as_str()),
            ChallengeProof::ThreeDs(pares) => ("pares", pares.as_str()),
        };
        let response = self
            .http
            .post(self.url("transaction/stepup/complete"))
            .bearer_auth(token)
            .form(&[
                ("merchant_id", self.config.merchant_id.as_str()),
                ("basket_id", request.basket_id.as_str()),
                ("transaction_id", request.gateway_transaction_id.as_str()),
                (proof_field, proof_value),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_charge_response(response).await
    }

    async fn fetch_charge_status(
        &self,
        basket_id: &BasketId,
        amount: Amount,
    ) -> Result<RemoteChargeStatus, GatewayError> {
        let token = self
            .access_token(basket_id.as_str(), &amount.to_decimal_string())
            .await?;
        let response = self
            .http
            .get(self.url("transaction/status"))
            .bearer_auth(token)
            .query(&[
                ("merchant_id", self.config.merchant_id.as_str()),
                ("basket_id", basket_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if !response.status().is_success() {
            return Err(GatewayError::Rejected {
                code: response.status().as_u16().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let wire: StatusResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        match wire.order_status.as_str() {
            "SUCCESS" => {
                let invoice_id = wire.transaction_id.ok_or_else(|| {
                    GatewayError::InvalidResponse("settled status without transaction id".into())
                })?;
                Ok(RemoteChargeStatus::Paid {
                    invoice_id,
                    amount_minor_units: wire.transaction_amount.unwrap_or_default(),
                    instrument_token: wire.instrument_token,
                })
            }
            "FAILED" => Ok(RemoteChargeStatus::Failed {
                err_code: wire.err_code.unwrap_or_default(),
                err_msg: wire.err_msg.unwrap_or_default(),
            }),
            "PENDING" => Ok(RemoteChargeStatus::Pending),
            other => Err(GatewayError::InvalidResponse(format!(
                "unknown order status {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    err_code: String,
    #[serde(default)]
    err_msg: String,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(rename = "Instrument_token", default)]
    instrument_token: Option<String>,
}

impl ChargeResponse {
    fn into_outcome(self) -> ChargeOutcome {
        ChargeOutcome {
            approved: self.err_code == GATEWAY_SUCCESS_CODE,
            invoice_id: self.transaction_id,
            err_code: self.err_code,
            err_msg: self.err_msg,
            instrument_token: self.instrument_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StepUpResponse {
    transaction_id: String,
    #[serde(default)]
    challenge_type: Option<String>,
    #[serde(default)]
    acs_url: Option<String>,
    #[serde(default)]
    pareq: Option<String>,
    #[serde(flatten)]
    charge: ChargeResponse,
}

#[derive(Debug, Deserialize)]
struct InstrumentListResponse {
    instruments: Vec<InstrumentWire>,
}

#[derive(Debug, Deserialize)]
struct InstrumentWire {
    instrument_token: String,
    card_mask: String,
    scheme: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    order_status: String,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    transaction_amount: Option<i64>,
    #[serde(rename = "Instrument_token", default)]
    instrument_token: Option<String>,
    #[serde(default)]
    err_code: Option<String>,
    #[serde(default)]
    err_msg: Option<String>,
}
