//! Contract endings and the session day cycle: cancellation, disputes, the
//! dual-rating completion window, check-ins, and the auto-completion sweep.

mod common;

use common::*;

use tutorlink::application::handlers::contract::{
    CancelContractCommand, SubmitRatingCommand, SubmitRatingResult, TerminateContractCommand,
    TerminationIntent,
};
use tutorlink::application::handlers::payment::ChargeRecurringCommand;
use tutorlink::application::handlers::session::CheckInSessionCommand;
use tutorlink::domain::contract::ContractStatus;
use tutorlink::domain::foundation::{ErrorCode, UserId};
use tutorlink::domain::session::{ScheduleStatus, SessionDetailStatus};
use tutorlink::ports::SessionRepository;

fn rating(contract_id: tutorlink::domain::foundation::ContractId, actor: UserId) -> SubmitRatingCommand {
    SubmitRatingCommand {
        contract_id,
        actor,
        rating: 5,
        review: "Great experience".to_string(),
    }
}

#[tokio::test]
async fn completion_request_opens_the_rating_window() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    let notified_before = app.notifier.sent_to(&tutor()).len();

    let status = app
        .terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: parent(),
            intent: TerminationIntent::CompletionRequested,
        })
        .await
        .unwrap();
    assert_eq!(status, ContractStatus::PendingCompletion);

    let tutor_inbox = app.notifier.sent_to(&tutor());
    assert_eq!(tutor_inbox.len(), notified_before + 1);
    assert_eq!(tutor_inbox.last().unwrap().title, "Contract completion requested");
}

#[tokio::test]
async fn contract_completes_once_both_parties_have_rated() {
    let app = TestApp::new();
    let (offer, contract) = app.active_contract().await;
    app.terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: parent(),
            intent: TerminationIntent::CompletionRequested,
        })
        .await
        .unwrap();

    let first = app
        .submit_rating()
        .handle(rating(contract.id, parent()))
        .await
        .unwrap();
    assert_eq!(first, SubmitRatingResult::AwaitingCounterparty);
    assert_eq!(
        app.contract(&contract.id).await.status,
        ContractStatus::PendingCompletion
    );
    let nudge = app.notifier.sent_to(&tutor());
    assert_eq!(nudge.last().unwrap().title, "Please rate your contract");

    let second = app
        .submit_rating()
        .handle(rating(contract.id, tutor()))
        .await
        .unwrap();
    assert_eq!(second, SubmitRatingResult::Completed);

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Completed);
    assert!(contract.end_date.is_some());

    let schedules = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap();
    assert!(schedules.is_empty());

    for party in [parent(), tutor()] {
        let inbox = app.notifier.sent_to(&party);
        assert_eq!(inbox.last().unwrap().title, "Contract completed");
    }
}

#[tokio::test]
async fn a_party_cannot_rate_twice() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    app.terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: parent(),
            intent: TerminationIntent::CompletionRequested,
        })
        .await
        .unwrap();

    app.submit_rating()
        .handle(rating(contract.id, parent()))
        .await
        .unwrap();
    let err = app
        .submit_rating()
        .handle(rating(contract.id, parent()))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateReview);
}

#[tokio::test]
async fn ratings_are_rejected_outside_the_completion_window() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    let err = app
        .submit_rating()
        .handle(rating(contract.id, parent()))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn dispute_requires_a_reason() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    let err = app
        .terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: parent(),
            intent: TerminationIntent::Dispute {
                reason: "   ".to_string(),
            },
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);
    assert_eq!(app.contract(&contract.id).await.status, ContractStatus::Active);
}

#[tokio::test]
async fn disputed_contract_is_frozen_for_billing() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;

    let status = app
        .terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: tutor(),
            intent: TerminationIntent::Dispute {
                reason: "Sessions not delivered".to_string(),
            },
        })
        .await
        .unwrap();
    assert_eq!(status, ContractStatus::Dispute);

    let stored = app.contract(&contract.id).await;
    assert_eq!(stored.dispute_reason.as_deref(), Some("Sessions not delivered"));
    assert_eq!(stored.disputed_by, Some(tutor()));

    let err = app
        .charge_recurring()
        .handle(ChargeRecurringCommand {
            contract_id: contract.id,
            customer: customer(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn strangers_cannot_end_a_contract() {
    let app = TestApp::new();
    let (_, contract) = app.active_contract().await;
    let outsider = UserId::new("someone-else").unwrap();

    let err = app
        .terminate()
        .handle(TerminateContractCommand {
            contract_id: contract.id,
            actor: outsider.clone(),
            intent: TerminationIntent::CompletionRequested,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);

    let err = app
        .cancel()
        .handle(CancelContractCommand {
            contract_id: contract.id,
            actor: outsider,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);
}

#[tokio::test]
async fn cancellation_deactivates_schedules_and_tells_the_other_party() {
    let app = TestApp::new();
    let (offer, contract) = app.active_contract().await;

    app.cancel()
        .handle(CancelContractCommand {
            contract_id: contract.id,
            actor: parent(),
        })
        .await
        .unwrap();

    let contract = app.contract(&contract.id).await;
    assert_eq!(contract.status, ContractStatus::Cancelled);
    assert!(contract.end_date.is_some());

    let schedules = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap();
    assert!(schedules.is_empty());

    let tutor_inbox = app.notifier.sent_to(&tutor());
    assert_eq!(tutor_inbox.last().unwrap().title, "Contract cancelled");
}

#[tokio::test]
async fn tutor_checks_in_and_the_parent_is_told() {
    let app = TestApp::new();
    let (offer, _) = app.active_contract().await;
    let schedule = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap()
        .remove(0);

    let detail_id = app
        .check_in()
        .handle(CheckInSessionCommand {
            schedule_id: schedule.id,
            actor: tutor(),
        })
        .await
        .unwrap();

    let detail = app
        .sessions
        .find_detail_by_id(&detail_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.status, SessionDetailStatus::Created);
    assert_eq!(detail.schedule_id, schedule.id);

    let parent_inbox = app.notifier.sent_to(&parent());
    assert_eq!(parent_inbox.last().unwrap().title, "Session started");

    // Same schedule, same day: the second check-in bounces.
    let err = app
        .check_in()
        .handle(CheckInSessionCommand {
            schedule_id: schedule.id,
            actor: tutor(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::DuplicateCheckIn);
}

#[tokio::test]
async fn only_the_tutor_may_check_in() {
    let app = TestApp::new();
    let (offer, _) = app.active_contract().await;
    let schedule = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap()
        .remove(0);

    let err = app
        .check_in()
        .handle(CheckInSessionCommand {
            schedule_id: schedule.id,
            actor: parent(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Forbidden);
}

#[tokio::test]
async fn sweep_completes_a_session_after_its_duration() {
    let app = TestApp::new();
    let (offer, _) = app.active_contract().await;
    let schedule = app
        .sessions
        .find_active_schedules_for_offer(&offer.id)
        .await
        .unwrap()
        .remove(0);
    let detail_id = app
        .check_in()
        .handle(CheckInSessionCommand {
            schedule_id: schedule.id,
            actor: tutor(),
        })
        .await
        .unwrap();
    let detail = app
        .sessions
        .find_detail_by_id(&detail_id)
        .await
        .unwrap()
        .unwrap();
    let sweep = app.session_completion();

    // Ten minutes into a one-hour lesson: nothing happens.
    let report = sweep.run_once(detail.created_at.plus_secs(600)).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.not_due, 1);
    assert_eq!(report.completed, 0);

    // After the full hour the day closes and the count moves.
    let report = sweep.run_once(detail.created_at.plus_secs(3600)).await.unwrap();
    assert_eq!(report.completed, 1);

    let detail = app
        .sessions
        .find_detail_by_id(&detail_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.status, SessionDetailStatus::Completed);

    let schedule = app
        .sessions
        .find_schedule_by_id(&schedule.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(schedule.status, ScheduleStatus::Active);
    assert_eq!(schedule.sessions_completed, 1);

    for party in [parent(), tutor()] {
        let inbox = app.notifier.sent_to(&party);
        assert_eq!(inbox.last().unwrap().title, "Session completed");
    }

    // Completed days are not scanned again.
    let report = sweep.run_once(detail.created_at.plus_secs(7200)).await.unwrap();
    assert_eq!(report.scanned, 0);
}
