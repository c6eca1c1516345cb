//! Dual-rating closure.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::application::locks::ContractLocks;
use crate::domain::contract::{ContractReview, ContractStatus, ReviewerRole};
use crate::domain::foundation::{ContractId, DomainError, ErrorCode, Rating, UserId};
use crate::ports::{
    ContractRepository, Notification, Notifier, ReviewRepository, SessionRepository,
};

/// One party's rating of the other, allowed only while the contract is in
/// its pending-completion window.
#[derive(Debug, Clone)]
pub struct SubmitRatingCommand {
    pub contract_id: ContractId,
    pub actor: UserId,
    pub rating: u8,
    pub review: String,
}

/// Outcome of a rating submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRatingResult {
    /// Recorded; the contract stays open until the other party rates.
    AwaitingCounterparty,

    /// Both parties have rated; the contract is now `Completed`.
    Completed,
}

/// Records a rating and closes the contract once both sides have one.
pub struct SubmitRatingHandler {
    contracts: Arc<dyn ContractRepository>,
    reviews: Arc<dyn ReviewRepository>,
    sessions: Arc<dyn SessionRepository>,
    notifier: Arc<dyn Notifier>,
    locks: Arc<ContractLocks>,
}

impl SubmitRatingHandler {
    pub fn new(
        contracts: Arc<dyn ContractRepository>,
        reviews: Arc<dyn ReviewRepository>,
        sessions: Arc<dyn SessionRepository>,
        notifier: Arc<dyn Notifier>,
        locks: Arc<ContractLocks>,
    ) -> Self {
        Self {
            contracts,
            reviews,
            sessions,
            notifier,
            locks,
        }
    }

    pub async fn handle(
        &self,
        command: SubmitRatingCommand,
    ) -> Result<SubmitRatingResult, DomainError> {
        let _guard = self.locks.acquire(&command.contract_id).await;

        let mut contract = self
            .contracts
            .find_by_id(&command.contract_id)
            .await?
            .ok_or_else(|| DomainError::contract_not_found(command.contract_id))?;

        if contract.status != ContractStatus::PendingCompletion {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Ratings are only accepted while the contract awaits completion",
            ));
        }
        let reviewed = contract.counterparty(&command.actor)?;
        if self
            .reviews
            .find_by_contract_and_reviewer(&contract.id, &command.actor)
            .await?
            .is_some()
        {
            return Err(DomainError::new(
                ErrorCode::DuplicateReview,
                "This party has already rated the contract",
            ));
        }

        let role = if command.actor == contract.parent_id {
            ReviewerRole::Parent
        } else {
            ReviewerRole::Tutor
        };
        let review = ContractReview::new(
            contract.id,
            command.actor.clone(),
            reviewed.clone(),
            role,
            Rating::new(command.rating)?,
            command.review,
        );
        self.reviews.save(&review).await?;

        let all = self.reviews.find_by_contract(&contract.id).await?;
        if all.len() < 2 {
            info!(
                contract_id = %contract.id,
                reviewer = %command.actor,
                "Rating recorded; awaiting the other party"
            );
            self.notifier
                .notify(
                    Notification::new(
                        reviewed,
                        "Please rate your contract",
                        "The other party has rated your tutoring contract. \
                         Add your rating to close it.",
                    )
                    .with_data(json!({ "contract_id": contract.id })),
                )
                .await;
            return Ok(SubmitRatingResult::AwaitingCounterparty);
        }

        contract.complete()?;
        self.contracts.update(&contract).await?;

        for mut schedule in self
            .sessions
            .find_active_schedules_for_offer(&contract.offer_id)
            .await?
        {
            if let Err(err) = schedule.deactivate() {
                warn!(schedule_id = %schedule.id, error = %err, "Could not deactivate schedule");
                continue;
            }
            self.sessions.update_schedule(&schedule).await?;
        }

        info!(contract_id = %contract.id, "Both parties rated; contract completed");
        for party in [contract.parent_id.clone(), contract.tutor_id.clone()] {
            self.notifier
                .notify(
                    Notification::new(
                        party,
                        "Contract completed",
                        "Both ratings are in and your tutoring contract is closed",
                    )
                    .with_data(json!({ "contract_id": contract.id })),
                )
                .await;
        }

        Ok(SubmitRatingResult::Completed)
    }
}
