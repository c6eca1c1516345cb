//! Monthly session provisioning.

use std::sync::Arc;

use tracing::info;

use crate::domain::contract::Contract;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::session::SessionSchedule;
use crate::ports::{OfferRepository, SessionRepository};

/// Creates the session shell for a billing month once its payment is
/// confirmed, exactly once per (tutor, parent, offer, month).
///
/// Callers hold the contract lock, so the find-then-create pair below never
/// races with itself for the same contract.
pub struct SessionProvisioner {
    sessions: Arc<dyn SessionRepository>,
    offers: Arc<dyn OfferRepository>,
}

impl SessionProvisioner {
    pub fn new(sessions: Arc<dyn SessionRepository>, offers: Arc<dyn OfferRepository>) -> Self {
        Self { sessions, offers }
    }

    /// Ensures the shell for `month` exists. Returns `true` if a new shell
    /// was created, `false` if the month was already provisioned.
    pub async fn ensure_month(&self, contract: &Contract, month: &str) -> Result<bool, DomainError> {
        let existing = self
            .sessions
            .find_schedule_for_month(
                &contract.tutor_id,
                &contract.parent_id,
                &contract.offer_id,
                month,
            )
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let offer = self
            .offers
            .find_by_id(&contract.offer_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OfferNotFound,
                    format!("Offer not found: {}", contract.offer_id),
                )
            })?;

        let schedule = SessionSchedule::new(
            contract.tutor_id.clone(),
            contract.parent_id.clone(),
            contract.offer_id,
            offer.child_name.clone(),
            offer.schedule.clone(),
            month,
        );
        self.sessions.save_schedule(&schedule).await?;

        info!(
            contract_id = %contract.id,
            schedule_id = %schedule.id,
            month,
            total_sessions = schedule.total_sessions,
            "Provisioned session schedule for billing month"
        );
        Ok(true)
    }
}
