//! End-to-end billing flows: hosted-checkout activation, webhook handling,
//! recurring charges, the step-up fallback, and reconciliation.

mod common;

use common::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use tutorlink::adapters::gateway::MockGateway;
use tutorlink::adapters::in_memory::{
    InMemoryBalanceLedger, InMemoryContractRepository, InMemoryOfferRepository,
    InMemorySessionRepository, InMemoryTransactionRepository,
};
use tutorlink::adapters::notify::RecordingNotifier;
use tutorlink::application::handlers::payment::{
    ChargeRecurringCommand, CompleteStepUpCommand, CompleteStepUpResult, ConfirmPaymentHandler,
    HandleGatewayNotificationHandler, NotificationResult, RecurringChargeResult,
    StartStepUpCommand, StartStepUpResult, StartSubscriptionCommand, StartSubscriptionHandler,
};
use tutorlink::application::handlers::session::SessionProvisioner;
use tutorlink::application::locks::ContractLocks;
use tutorlink::domain::contract::{Contract, ContractStatus};
use tutorlink::domain::foundation::{Amount, DomainError, ErrorCode, OfferId, UserId};
use tutorlink::domain::offer::Offer;
use tutorlink::domain::payment::{ChargeKind, TransactionStatus};
use tutorlink::ports::{
    BalanceLedger, ChallengeData, ChallengeProof, ContractRepository, GatewayError,
    OfferRepository, PaymentGateway, RemoteChargeStatus, SessionRepository, StepUpStart,
    StoredInstrument, TransactionRepository,
};

fn start_command(offer_id: tutorlink::domain::foundation::OfferId) -> StartSubscriptionCommand {
    StartSubscriptionCommand {
        offer_id,
        parent_id: parent(),
        tutor_id: tutor(),
        customer: customer(),
    }
}

async fn bill(app: &TestApp, contract: &Contract) -> RecurringChargeResult {
    app.charge_recurring()
        .handle(ChargeRecurringCommand {
            contract_id: contract.id,
            customer: customer(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn starting_a_subscription_creates_contract_and_pending_charge() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;

    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();

    let contract = app.contract(&result.contract_id).await;
    assert_eq!(contract.status, ContractStatus::Created);
    assert!(contract.instrument_token.is_none());
    assert!(contract.next_billing_date.is_none());

    assert!(result.checkout.basket_id.as_str().starts_with("SUB-"));
    let transaction = app
        .transactions
        .find_by_basket_id(&result.checkout.basket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.charge_kind, ChargeKind::Initial);
    assert!(transaction.is_pending());
    assert_eq!(transaction.amount, offer.amount_monthly);
}

#[tokio::test]
async fn second_subscription_for_the_same_offer_is_rejected() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;

    app.start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let err = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ContractAlreadyExists);
}

#[tokio::test]
async fn success_webhook_activates_the_contract() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;
    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();

    let outcome = app
        .notifications()
        .handle(success_notification(&basket, Some("tok_1")))
        .await
        .unwrap();
    assert_eq!(outcome, NotificationResult::Confirmed);

    let contract = app.contract(&result.contract_id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.instrument_token.as_deref(), Some("tok_1"));
    assert_eq!(contract.failure_count, 0);
    let paid_at = contract.last_payment_date.unwrap();
    assert_eq!(contract.next_billing_date, Some(paid_at.add_months(1)));

    let balance = app.ledger.balance(&tutor()).await.unwrap();
    assert_eq!(balance, Amount::from_minor_units(MONTHLY_MINOR_UNITS).unwrap());
    assert_eq!(app.transactions.earnings().await.len(), 1);

    let schedules = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].month, paid_at.month_key());

    assert_eq!(app.notifier.sent_to(&parent()).len(), 1);
    assert_eq!(app.notifier.sent_to(&tutor()).len(), 1);
}

#[tokio::test]
async fn duplicate_webhook_is_a_no_op() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;
    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();

    app.notifications()
        .handle(success_notification(&basket, Some("tok_1")))
        .await
        .unwrap();
    let second = app
        .notifications()
        .handle(success_notification(&basket, Some("tok_1")))
        .await
        .unwrap();
    assert_eq!(second, NotificationResult::AlreadyProcessed);

    // Credited and provisioned exactly once.
    let balance = app.ledger.balance(&tutor()).await.unwrap();
    assert_eq!(balance, Amount::from_minor_units(MONTHLY_MINOR_UNITS).unwrap());
    assert_eq!(app.transactions.earnings().await.len(), 1);
    let schedules = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap();
    assert_eq!(schedules.len(), 1);
}

#[tokio::test]
async fn tampered_webhook_is_discarded_without_touching_state() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;
    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();

    let mut notification = success_notification(&basket, Some("tok_1"));
    notification.validation_hash = "deadbeef".to_string();
    let err = app.notifications().handle(notification).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureMismatch);

    let contract = app.contract(&result.contract_id).await;
    assert_eq!(contract.status, ContractStatus::Created);
    let transaction = app
        .transactions
        .find_by_basket_id(&result.checkout.basket_id)
        .await
        .unwrap()
        .unwrap();
    assert!(transaction.is_pending());
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn failed_first_charge_leaves_the_contract_created() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;
    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();

    let outcome = app
        .notifications()
        .handle(failure_notification(&basket, "002"))
        .await
        .unwrap();
    assert_eq!(outcome, NotificationResult::FailureRecorded);

    let contract = app.contract(&result.contract_id).await;
    assert_eq!(contract.status, ContractStatus::Created);
    assert_eq!(contract.failure_count, 0);
    let transaction = app
        .transactions
        .find_by_basket_id(&result.checkout.basket_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn approved_recurring_charge_advances_the_billing_date() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    let first_billing_date = contract.next_billing_date.unwrap();

    app.gateway
        .queue_recurring(Ok(MockGateway::approved("INV-r1", None)));
    assert_eq!(bill(&app, &contract).await, RecurringChargeResult::Confirmed);

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.failure_count, 0);
    assert!(contract.next_billing_date.unwrap().is_after(&first_billing_date));
    // Token survives a response that did not echo one.
    assert_eq!(contract.instrument_token.as_deref(), Some("tok_1"));

    let calls = app.gateway.recurring_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].instrument_token, "tok_1");
}

#[tokio::test]
async fn third_consecutive_decline_suspends_the_subscription() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    for _ in 0..3 {
        app.gateway
            .queue_recurring(Ok(MockGateway::declined("041", "insufficient funds")));
    }
    assert_eq!(
        bill(&app, &contract).await,
        RecurringChargeResult::Failed { suspended: false }
    );
    assert_eq!(
        bill(&app, &contract).await,
        RecurringChargeResult::Failed { suspended: false }
    );
    assert_eq!(
        bill(&app, &contract).await,
        RecurringChargeResult::Failed { suspended: true }
    );

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Expired);
    assert_eq!(contract.failure_count, 3);
    assert!(contract.end_date.is_some());

    let suspended: Vec<_> = app
        .notifier
        .sent()
        .into_iter()
        .filter(|n| n.title == "Subscription suspended")
        .collect();
    assert_eq!(suspended.len(), 2);
}

#[tokio::test]
async fn successful_payment_resets_the_failure_streak() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    app.gateway
        .queue_recurring(Ok(MockGateway::declined("041", "insufficient funds")));
    app.gateway
        .queue_recurring(Ok(MockGateway::declined("041", "insufficient funds")));
    app.gateway
        .queue_recurring(Ok(MockGateway::approved("INV-r1", None)));
    app.gateway
        .queue_recurring(Ok(MockGateway::declined("041", "insufficient funds")));

    bill(&app, &contract).await;
    bill(&app, &contract).await;
    assert_eq!(app.contract(&contract.id).await.failure_count, 2);

    assert_eq!(bill(&app, &contract).await, RecurringChargeResult::Confirmed);
    assert_eq!(app.contract(&contract.id).await.failure_count, 0);

    // The streak starts over rather than resuming at two.
    assert_eq!(
        bill(&app, &contract).await,
        RecurringChargeResult::Failed { suspended: false }
    );
    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.failure_count, 1);
}

#[tokio::test]
async fn recurring_without_a_stored_credential_is_rejected() {
    let app = TestApp::new();
    let offer = app.accepted_offer().await;
    let result = app
        .start_subscription()
        .handle(start_command(offer.id))
        .await
        .unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();
    // Activated, but the gateway stored no credential.
    app.notifications()
        .handle(success_notification(&basket, None))
        .await
        .unwrap();

    let contract = app.contract(&result.contract_id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert!(contract.instrument_token.is_none());

    let err = app
        .charge_recurring()
        .handle(ChargeRecurringCommand {
            contract_id: contract.id,
            customer: customer(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
}

#[tokio::test]
async fn timed_out_charge_is_settled_by_reconciliation() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    let billing_date_before = contract.next_billing_date;

    app.gateway.queue_recurring(Err(GatewayError::Timeout(30)));
    assert_eq!(bill(&app, &contract).await, RecurringChargeResult::Pending);
    assert_eq!(
        app.contract(&contract.id).await.next_billing_date,
        billing_date_before
    );

    let pending = app.transactions.find_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    let basket = pending[0].basket_id.clone();
    assert!(basket.as_str().starts_with("RECUR-"));

    app.gateway.set_status(
        &basket,
        RemoteChargeStatus::Paid {
            invoice_id: "INV-recon".to_string(),
            amount_minor_units: MONTHLY_MINOR_UNITS,
            instrument_token: None,
        },
    );
    let reconciliation = app.reconciliation();
    let report = reconciliation.run_once().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.confirmed, 1);

    let contract = app.contract(&contract.id).await;
    assert!(contract.next_billing_date.unwrap().is_after(&billing_date_before.unwrap()));
    let transaction = app
        .transactions
        .find_by_basket_id(&basket)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Paid);
    assert_eq!(transaction.invoice_id.as_deref(), Some("INV-recon"));

    // A second pass finds nothing left to do.
    let report = reconciliation.run_once().await.unwrap();
    assert_eq!(report.scanned, 0);
}

#[tokio::test]
async fn reconciliation_records_remotely_failed_charges() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    app.gateway.queue_recurring(Err(GatewayError::Timeout(30)));
    bill(&app, &contract).await;
    let basket = app.transactions.find_pending(10).await.unwrap()[0]
        .basket_id
        .clone();

    app.gateway.set_status(
        &basket,
        RemoteChargeStatus::Failed {
            err_code: "041".to_string(),
            err_msg: "insufficient funds".to_string(),
        },
    );
    let report = app.reconciliation().run_once().await.unwrap();
    assert_eq!(report.failed, 1);

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.failure_count, 1);
}

#[tokio::test]
async fn reconciliation_leaves_still_pending_charges_alone() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    app.gateway.queue_recurring(Err(GatewayError::Timeout(30)));
    bill(&app, &contract).await;

    // No status scripted: the gateway still reports the charge in flight.
    let report = app.reconciliation().run_once().await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.still_pending, 1);
    assert_eq!(report.confirmed + report.failed, 0);
    assert_eq!(app.transactions.find_pending(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn challenged_step_up_charge_confirms_after_otp() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    let billing_date_before = contract.next_billing_date.unwrap();

    // The payer picks a different card from the gateway's stored list.
    app.gateway.add_instrument(StoredInstrument {
        token: "tok_other_card".to_string(),
        masked_pan: "411111******1111".to_string(),
        scheme: "VISA".to_string(),
    });
    let cards = app
        .gateway
        .list_stored_instruments(&customer().mobile)
        .await
        .unwrap();
    assert_eq!(cards.len(), 1);
    let chosen = &cards[0];
    assert_eq!(chosen.masked_pan, "411111******1111");

    app.gateway.queue_step_up_start(Ok(StepUpStart {
        gateway_transaction_id: "gw-tx-9".to_string(),
        challenge: Some(ChallengeData::Otp),
        outcome: None,
    }));
    let started = app
        .step_up()
        .start(StartStepUpCommand {
            contract_id: contract.id,
            instrument_token: chosen.token.clone(),
            cvv: "123".to_string(),
            customer: customer(),
        })
        .await
        .unwrap();
    let StartStepUpResult::Challenged {
        basket_id,
        gateway_transaction_id,
        challenge,
    } = started
    else {
        panic!("expected a challenge, got {:?}", started);
    };
    assert_eq!(challenge, ChallengeData::Otp);

    app.gateway
        .queue_step_up_completion(Ok(MockGateway::approved("INV-su", Some("tok_other_card"))));
    let completed = app
        .step_up()
        .complete(CompleteStepUpCommand {
            basket_id,
            gateway_transaction_id,
            proof: ChallengeProof::Otp("123456".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(completed, CompleteStepUpResult::Confirmed);

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.instrument_token.as_deref(), Some("tok_other_card"));
    assert!(contract.next_billing_date.unwrap().is_after(&billing_date_before));
}

#[tokio::test]
async fn declined_step_up_counts_toward_the_failure_streak() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    app.gateway.queue_step_up_start(Ok(StepUpStart {
        gateway_transaction_id: "gw-tx-9".to_string(),
        challenge: None,
        outcome: Some(MockGateway::declined("054", "expired card")),
    }));
    let started = app
        .step_up()
        .start(StartStepUpCommand {
            contract_id: contract.id,
            instrument_token: "tok_other_card".to_string(),
            cvv: "123".to_string(),
            customer: customer(),
        })
        .await
        .unwrap();
    assert_eq!(started, StartStepUpResult::Declined { suspended: false });

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(contract.failure_count, 1);
}

/// Ledger whose next credit fails, as a transient store outage would.
struct FlakyLedger {
    inner: InMemoryBalanceLedger,
    fail_next_credit: AtomicBool,
}

impl FlakyLedger {
    fn new() -> Self {
        Self {
            inner: InMemoryBalanceLedger::new(),
            fail_next_credit: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BalanceLedger for FlakyLedger {
    async fn credit(&self, tutor_id: &UserId, amount: Amount) -> Result<(), DomainError> {
        if self.fail_next_credit.swap(false, Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "connection reset during credit",
            ));
        }
        self.inner.credit(tutor_id, amount).await
    }

    async fn balance(&self, tutor_id: &UserId) -> Result<Amount, DomainError> {
        self.inner.balance(tutor_id).await
    }
}

#[tokio::test]
async fn confirmation_is_retryable_after_a_credit_outage() {
    let offers = Arc::new(InMemoryOfferRepository::new());
    let contracts = Arc::new(InMemoryContractRepository::new());
    let transactions = Arc::new(InMemoryTransactionRepository::new());
    let sessions = Arc::new(InMemorySessionRepository::new());
    let ledger = Arc::new(FlakyLedger::new());
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
    let config = gateway_config();

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
    offers.save(&offer).await.unwrap();

    let start = StartSubscriptionHandler::new(
        offers.clone(),
        contracts.clone(),
        transactions.clone(),
        gateway.clone(),
        config.basket_prefixes(),
    );
    let result = start.handle(start_command(offer.id)).await.unwrap();
    let basket = result.checkout.basket_id.as_str().to_string();
    let notifications =
        HandleGatewayNotificationHandler::new(&config, transactions.clone(), confirm.clone());

    ledger.fail_next_credit.store(true, Ordering::SeqCst);
    let err = notifications
        .handle(success_notification(&basket, Some("tok_1")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);

    // The charge is not marked settled, so nothing was half-applied for good:
    // the contract is still awaiting activation and no money moved.
    let transaction = transactions
        .find_by_basket_id(&result.checkout.basket_id)
        .await
        .unwrap()
        .unwrap();
    assert!(transaction.is_pending());
    let contract = contracts
        .find_by_id(&result.contract_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contract.status, ContractStatus::Created);
    assert!(ledger.balance(&tutor()).await.unwrap().is_zero());
    assert!(transactions.earnings().await.is_empty());

    // The gateway redelivers the notification and the retry applies cleanly.
    let outcome = notifications
        .handle(success_notification(&basket, Some("tok_1")))
        .await
        .unwrap();
    assert_eq!(outcome, NotificationResult::Confirmed);

    let contract = contracts
        .find_by_id(&result.contract_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(contract.status, ContractStatus::Active);
    assert_eq!(
        ledger.balance(&tutor()).await.unwrap(),
        Amount::from_minor_units(MONTHLY_MINOR_UNITS).unwrap()
    );
    assert_eq!(transactions.earnings().await.len(), 1);
    let schedules = sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap();
    assert_eq!(schedules.len(), 1);
}
