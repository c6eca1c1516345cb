//! Offer aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Amount, DomainError, ErrorCode, OfferId, StateMachine, Timestamp, UserId,
};

use super::{LessonSchedule, OfferStatus};

/// A tutoring proposal between two parties.
///
/// Created by the proposing party (either side may propose); mutated only by
/// the receiving party's accept or reject. Exactly one live contract may
/// exist per accepted offer - that guard lives in the subscription ledger,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Unique identifier.
    pub id: OfferId,

    /// Party who proposed the offer.
    pub sender_id: UserId,

    /// Party who must accept or reject it.
    pub receiver_id: UserId,

    /// Child the tutoring is for.
    pub child_name: String,

    /// Subject taught.
    pub subject: String,

    /// Monthly billing amount in minor units.
    pub amount_monthly: Amount,

    /// Agreed weekly lesson schedule.
    pub schedule: LessonSchedule,

    /// Current status.
    pub status: OfferStatus,

    /// When the offer was created.
    pub created_at: Timestamp,

    /// When the offer was last updated.
    pub updated_at: Timestamp,
}

impl Offer {
    /// Creates a new pending offer.
    pub fn new(
        id: OfferId,
        sender_id: UserId,
        receiver_id: UserId,
        child_name: impl Into<String>,
        subject: impl Into<String>,
        amount_monthly: Amount,
        schedule: LessonSchedule,
    ) -> Result<Self, DomainError> {
        if sender_id == receiver_id {
            return Err(DomainError::validation(
                "receiver_id",
                "Offer sender and receiver must be different users",
            ));
        }
        let now = Timestamp::now();
        Ok(Self {
            id,
            sender_id,
            receiver_id,
            child_name: child_name.into(),
            subject: subject.into(),
            amount_monthly,
            schedule,
            status: OfferStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Accepts the offer. Only the receiving party may do this.
    pub fn accept(&mut self, actor: &UserId) -> Result<(), DomainError> {
        self.decide(actor, OfferStatus::Accepted)
    }

    /// Rejects the offer. Only the receiving party may do this.
    pub fn reject(&mut self, actor: &UserId) -> Result<(), DomainError> {
        self.decide(actor, OfferStatus::Rejected)
    }

    fn decide(&mut self, actor: &UserId, decision: OfferStatus) -> Result<(), DomainError> {
        if actor != &self.receiver_id {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Only the offer receiver may accept or reject it",
            ));
        }
        self.status = self.status.transition_to(decision).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Offer is already {:?}", self.status),
            )
        })?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// True once the receiver has accepted.
    pub fn is_accepted(&self) -> bool {
        self.status == OfferStatus::Accepted
    }
}
