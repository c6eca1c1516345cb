//! Monthly session schedule shell.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, OfferId, SessionScheduleId, StateMachine, Timestamp, UserId,
};
use crate::domain::offer::LessonSchedule;

/// Status of a monthly schedule shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Sessions run and count toward completion.
    Active,

    /// Deactivated by contract closure or cancellation; stops future
    /// billing-month scheduling.
    Cancelled,
}

impl StateMachine for ScheduleStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (ScheduleStatus::Active, ScheduleStatus::Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            ScheduleStatus::Active => vec![ScheduleStatus::Cancelled],
            ScheduleStatus::Cancelled => vec![],
        }
    }
}

/// The recurring session shell, one row per billing month per contract.
///
/// Keyed by (tutor, parent, offer, month); the provisioner checks for an
/// existing row before creating one so overlapping confirmation paths never
/// duplicate a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    /// Unique identifier.
    pub id: SessionScheduleId,

    /// Earning party.
    pub tutor_id: UserId,

    /// Paying party.
    pub parent_id: UserId,

    /// Offer the schedule fulfils.
    pub offer_id: OfferId,

    /// Child the tutoring is for.
    pub child_name: String,

    /// Weekly lesson times copied from the offer at provisioning time.
    pub lesson_schedule: LessonSchedule,

    /// Expected session count for the month.
    pub total_sessions: u32,

    /// Sessions finished so far this month.
    pub sessions_completed: u32,

    /// Whether the shell is live.
    pub status: ScheduleStatus,

    /// Billing-month key, e.g. `"2026-08"`.
    pub month: String,

    /// When the shell was created.
    pub created_at: Timestamp,

    /// When the shell was last updated.
    pub updated_at: Timestamp,
}

impl SessionSchedule {
    /// Creates an active shell for one billing month.
    ///
    /// `total_sessions` approximates lesson days per week over a month.
    pub fn new(
        tutor_id: UserId,
        parent_id: UserId,
        offer_id: OfferId,
        child_name: impl Into<String>,
        lesson_schedule: LessonSchedule,
        month: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        let total_sessions = (lesson_schedule.days_per_week() * 4) as u32;
        Self {
            id: SessionScheduleId::new(),
            tutor_id,
            parent_id,
            offer_id,
            child_name: child_name.into(),
            lesson_schedule,
            total_sessions,
            sessions_completed: 0,
            status: ScheduleStatus::Active,
            month: month.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records one finished day-level session.
    pub fn record_completed_session(&mut self) -> Result<(), DomainError> {
        if self.status != ScheduleStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Cannot complete a session on a cancelled schedule",
            ));
        }
        self.sessions_completed += 1;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Deactivates the shell, stopping future scheduling.
    pub fn deactivate(&mut self) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(ScheduleStatus::Cancelled)
            .map_err(|_| {
                DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    "Schedule is already cancelled",
                )
            })?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
