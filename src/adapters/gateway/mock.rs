//! Scriptable gateway double for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::Amount;
use crate::domain::payment::BasketId;
use crate::ports::{
    ChargeOutcome, CompleteStepUpRequest, GatewayError, HostedCheckout, InitiateChargeRequest,
    PaymentGateway, RecurringChargeRequest, RemoteChargeStatus, StepUpChargeRequest, StepUpStart,
    StoredInstrument,
};

/// Test gateway whose responses are queued up front.
///
/// Recurring and step-up results are consumed in FIFO order; status queries
/// are looked up by basket id and default to `Pending` for unknown baskets.
#[derive(Default)]
pub struct MockGateway {
    recurring_results: Mutex<VecDeque<Result<ChargeOutcome, GatewayError>>>,
    step_up_starts: Mutex<VecDeque<Result<StepUpStart, GatewayError>>>,
    step_up_completions: Mutex<VecDeque<Result<ChargeOutcome, GatewayError>>>,
    statuses: Mutex<HashMap<String, RemoteChargeStatus>>,
    instruments: Mutex<Vec<StoredInstrument>>,
    recurring_calls: Mutex<Vec<RecurringChargeRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_recurring(&self, result: Result<ChargeOutcome, GatewayError>) {
        self.recurring_results.lock().unwrap().push_back(result);
    }

    pub fn queue_step_up_start(&self, result: Result<StepUpStart, GatewayError>) {
        self.step_up_starts.lock().unwrap().push_back(result);
    }

    pub fn queue_step_up_completion(&self, result: Result<ChargeOutcome, GatewayError>) {
        self.step_up_completions.lock().unwrap().push_back(result);
    }

    pub fn set_status(&self, basket_id: &BasketId, status: RemoteChargeStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(basket_id.as_str().to_string(), status);
    }

    pub fn add_instrument(&self, instrument: StoredInstrument) {
        self.instruments.lock().unwrap().push(instrument);
    }

    /// Recurring charge requests seen so far.
    pub fn recurring_calls(&self) -> Vec<RecurringChargeRequest> {
        self.recurring_calls.lock().unwrap().clone()
    }

    /// An approved outcome for queueing.
    pub fn approved(invoice_id: &str, instrument_token: Option<&str>) -> ChargeOutcome {
        ChargeOutcome {
            approved: true,
            invoice_id: Some(invoice_id.to_string()),
            err_code: "000".to_string(),
            err_msg: "success".to_string(),
            instrument_token: instrument_token.map(String::from),
        }
    }

    /// A declined outcome for queueing.
    pub fn declined(err_code: &str, err_msg: &str) -> ChargeOutcome {
        ChargeOutcome {
            approved: false,
            invoice_id: None,
            err_code: err_code.to_string(),
            err_msg: err_msg.to_string(),
            instrument_token: None,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initiate_charge(
        &self,
        request: InitiateChargeRequest,
    ) -> Result<HostedCheckout, GatewayError> {
        Ok(HostedCheckout {
            redirect_url: "https://gateway.test/transaction".to_string(),
            form_fields: vec![(
                "basket_id".to_string(),
                request.basket_id.as_str().to_string(),
            )],
            basket_id: request.basket_id,
        })
    }

    async fn charge_stored_instrument(
        &self,
        request: RecurringChargeRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.recurring_calls.lock().unwrap().push(request);
        self.recurring_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::InvalidResponse(
                    "no recurring result queued".to_string(),
                ))
            })
    }

    async fn list_stored_instruments(
        &self,
        _customer_mobile: &str,
    ) -> Result<Vec<StoredInstrument>, GatewayError> {
        Ok(self.instruments.lock().unwrap().clone())
    }

    async fn start_step_up_charge(
        &self,
        _request: StepUpChargeRequest,
    ) -> Result<StepUpStart, GatewayError> {
        self.step_up_starts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::InvalidResponse(
                    "no step-up start queued".to_string(),
                ))
            })
    }

    async fn complete_step_up_charge(
        &self,
        _request: CompleteStepUpRequest,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.step_up_completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::InvalidResponse(
                    "no step-up completion queued".to_string(),
                ))
            })
    }

    async fn fetch_charge_status(
        &self,
        basket_id: &BasketId,
        _amount: Amount,
    ) -> Result<RemoteChargeStatus, GatewayError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(basket_id.as_str())
            .cloned()
            .unwrap_or(RemoteChargeStatus::Pending))
    }
}
