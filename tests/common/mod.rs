//! Shared wiring for workflow tests: in-memory repositories, the scriptable
//! gateway, and a recording notifier behind the real handlers.

use std::sync::Arc;

use secrecy::SecretString;

use tutorlink::adapters::gateway::MockGateway;
use tutorlink::adapters::in_memory::{
    InMemoryBalanceLedger, InMemoryContractRepository, InMemoryOfferRepository,
    InMemoryReviewRepository, InMemorySessionRepository, InMemoryTransactionRepository,
};
use tutorlink::adapters::notify::RecordingNotifier;
use tutorlink::application::handlers::contract::{
    CancelContractHandler, SubmitRatingHandler, TerminateContractHandler,
};
use tutorlink::application::handlers::payment::{
    ChargeRecurringHandler, ConfirmPaymentHandler, HandleGatewayNotificationHandler,
    StartSubscriptionCommand, StartSubscriptionHandler, StepUpChargeHandler,
};
use tutorlink::application::handlers::session::{CheckInSessionHandler, SessionProvisioner};
use tutorlink::application::locks::ContractLocks;
use tutorlink::application::loops::{ReconciliationLoop, SessionCompletionLoop};
use tutorlink::config::GatewayConfig;
use tutorlink::domain::contract::Contract;
use tutorlink::domain::foundation::{Amount, ContractId, OfferId, UserId};
use tutorlink::domain::offer::{LessonSchedule, Offer};
use tutorlink::domain::payment::{notification_hash, GatewayNotification};
use tutorlink::ports::{ContractRepository, CustomerContact, OfferRepository};

pub const MERCHANT_ID: &str = "MERCHANT01";
pub const SECRET: &str = "shared-secret-123";
pub const MONTHLY_MINOR_UNITS: i64 = 500000;

pub struct TestApp {
    pub offers: Arc<InMemoryOfferRepository>,
    pub contracts: Arc<InMemoryContractRepository>,
    pub transactions: Arc<InMemoryTransactionRepository>,
    pub sessions: Arc<InMemorySessionRepository>,
    pub reviews: Arc<InMemoryReviewRepository>,
    pub ledger: Arc<InMemoryBalanceLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub gateway: Arc<MockGateway>,
    pub locks: Arc<ContractLocks>,
    pub provisioner: Arc<SessionProvisioner>,
    pub confirm: Arc<ConfirmPaymentHandler>,
    pub config: GatewayConfig,
}

impl TestApp {
    pub fn new() -> Self {
        let offers = Arc::new(InMemoryOfferRepository::new());
        let contracts = Arc::new(InMemoryContractRepository::new());
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let sessions = Arc::new(InMemorySessionRepository::new());
        let reviews = Arc::new(InMemoryReviewRepository::new());
        let ledger = Arc::new(InMemoryBalanceLedger::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let gateway = Arc::new(MockGateway::new());
        let locks = Arc::new(ContractLocks::new());
        let provisioner = Arc::new(SessionProvisioner::new(sessions.clone(), offers.clone()));
        let confirm = Arc::new(ConfirmPaymentHandler::new(
            contracts.clone(),
            transactions.clone(),
            ledger.clone(),
            notifier.clone(),
            provisioner.clone(),
            locks.clone(),
        ));

        Self {
            offers,
            contracts,
            transactions,
            sessions,
            reviews,
            ledger,
            notifier,
            gateway,
            locks,
            provisioner,
            confirm,
            config: gateway_config(),
        }
    }

    pub fn start_subscription(&self) -> StartSubscriptionHandler {
        StartSubscriptionHandler::new(
            self.offers.clone(),
            self.contracts.clone(),
            self.transactions.clone(),
            self.gateway.clone(),
            self.config.basket_prefixes(),
        )
    }

    pub fn notifications(&self) -> HandleGatewayNotificationHandler {
        HandleGatewayNotificationHandler::new(
            &self.config,
            self.transactions.clone(),
            self.confirm.clone(),
        )
    }

    pub fn charge_recurring(&self) -> ChargeRecurringHandler {
        ChargeRecurringHandler::new(
            self.contracts.clone(),
            self.offers.clone(),
            self.transactions.clone(),
            self.gateway.clone(),
            self.confirm.clone(),
            self.config.basket_prefixes(),
        )
    }

    pub fn step_up(&self) -> StepUpChargeHandler {
        StepUpChargeHandler::new(
            self.contracts.clone(),
            self.offers.clone(),
            self.transactions.clone(),
            self.gateway.clone(),
            self.confirm.clone(),
            self.config.basket_prefixes(),
        )
    }

    pub fn terminate(&self) -> TerminateContractHandler {
        TerminateContractHandler::new(
            self.contracts.clone(),
            self.notifier.clone(),
            self.locks.clone(),
        )
    }

    pub fn cancel(&self) -> CancelContractHandler {
        CancelContractHandler::new(
            self.contracts.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
            self.locks.clone(),
        )
    }

    pub fn submit_rating(&self) -> SubmitRatingHandler {
        SubmitRatingHandler::new(
            self.contracts.clone(),
            self.reviews.clone(),
            self.sessions.clone(),
            self.notifier.clone(),
            self.locks.clone(),
        )
    }

    pub fn check_in(&self) -> CheckInSessionHandler {
        CheckInSessionHandler::new(self.sessions.clone(), self.notifier.clone())
    }

    pub fn reconciliation(&self) -> ReconciliationLoop {
        ReconciliationLoop::new(
            self.transactions.clone(),
            self.gateway.clone(),
            self.confirm.clone(),
            std::time::Duration::from_secs(600),
            100,
        )
    }

    pub fn session_completion(&self) -> SessionCompletionLoop {
        SessionCompletionLoop::new(
            self.sessions.clone(),
            self.offers.clone(),
            self.notifier.clone(),
            std::time::Duration::from_secs(300),
            100,
        )
    }

    /// Saves an accepted offer from `parent` to `tutor`.
    pub async fn accepted_offer(&self) -> Offer {
        let mut offer = Offer::new(
            OfferId::new(),
            parent(),
            tutor(),
            "Amir",
            "Mathematics",
            Amount::from_minor_units(MONTHLY_MINOR_UNITS).unwrap(),
            lesson_schedule(),
        )
        .unwrap();
        offer.accept(&tutor()).unwrap();
        self.offers.save(&offer).await.unwrap();
        offer
    }

    /// Starts a subscription and confirms its first payment, returning the
    /// now-active contract.
    pub async fn active_contract(&self) -> (Offer, Contract) {
        let offer = self.accepted_offer().await;
        let result = self
            .start_subscription()
            .handle(StartSubscriptionCommand {
                offer_id: offer.id,
                parent_id: parent(),
                tutor_id: tutor(),
                customer: customer(),
            })
            .await
            .unwrap();

        let basket = result.checkout.basket_id.as_str().to_string();
        self.notifications()
            .handle(success_notification(&basket, Some("tok_1")))
            .await
            .unwrap();

        let contract = self.contract(&result.contract_id).await;
        (offer, contract)
    }

    pub async fn contract(&self, id: &ContractId) -> Contract {
        self.contracts.find_by_id(id).await.unwrap().unwrap()
    }
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        merchant_id: MERCHANT_ID.to_string(),
        merchant_name: "TutorLink".to_string(),
        secret_key: SecretString::new(SECRET.to_string()),
        base_url: "https://gateway.test".to_string(),
        currency: "PKR".to_string(),
        request_timeout_secs: 30,
        initial_basket_prefix: "SUB-".to_string(),
        recurring_basket_prefix: "RECUR-".to_string(),
        success_url: "https://app.test/pay/success".to_string(),
        failure_url: "https://app.test/pay/failure".to_string(),
        checkout_url: "https://app.test/pay/checkout".to_string(),
    }
}

pub fn parent() -> UserId {
    UserId::new("parent-1").unwrap()
}

pub fn tutor() -> UserId {
    UserId::new("tutor-1").unwrap()
}

pub fn customer() -> CustomerContact {
    CustomerContact {
        email: Some("parent@example.com".to_string()),
        mobile: "03001234567".to_string(),
    }
}

pub fn lesson_schedule() -> LessonSchedule {
    LessonSchedule::new(
        chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        vec![chrono::Weekday::Mon, chrono::Weekday::Wed, chrono::Weekday::Fri],
    )
    .unwrap()
}

/// A validly-hashed success notification for `basket_id`.
pub fn success_notification(basket_id: &str, token: Option<&str>) -> GatewayNotification {
    notification(basket_id, "000", "success", token)
}

/// A validly-hashed failure notification for `basket_id`.
pub fn failure_notification(basket_id: &str, err_code: &str) -> GatewayNotification {
    notification(basket_id, err_code, "declined", None)
}

fn notification(
    basket_id: &str,
    err_code: &str,
    err_msg: &str,
    token: Option<&str>,
) -> GatewayNotification {
    GatewayNotification {
        basket_id: basket_id.to_string(),
        err_code: err_code.to_string(),
        err_msg: err_msg.to_string(),
        transaction_id: format!("INV-{}", basket_id),
        transaction_amount: MONTHLY_MINOR_UNITS,
        validation_hash: notification_hash(basket_id, SECRET, MERCHANT_ID, err_code),
        instrument_token: token.map(String::from),
        recurring_txn: token.map(|_| "TRUE".to_string()),
    }
}
