//! Day-level session instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionDetailId, SessionScheduleId, StateMachine, Timestamp, UserId,
};

/// Status of a single calendar-day session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionDetailStatus {
    /// Checked in; the completion loop will finish it after its duration.
    Created,

    /// Finished (automatically or otherwise).
    Completed,

    /// Cancelled by the tutor for the day.
    CancelledByTutor,

    /// Cancelled by the parent for the day.
    CancelledByParent,

    /// Tutor holiday.
    TutorHoliday,

    /// Public holiday.
    PublicHoliday,
}

impl StateMachine for SessionDetailStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionDetailStatus::*;
        matches!(
            (self, target),
            (Created, Completed)
                | (Created, CancelledByTutor)
                | (Created, CancelledByParent)
                | (Created, TutorHoliday)
                | (Created, PublicHoliday)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionDetailStatus::*;
        match self {
            Created => vec![
                Completed,
                CancelledByTutor,
                CancelledByParent,
                TutorHoliday,
                PublicHoliday,
            ],
            _ => vec![],
        }
    }
}

/// One calendar-day session instance.
///
/// At most one exists per (tutor, parent, schedule, calendar day); the
/// repository enforces the uniqueness, the check-in handler surfaces the
/// violation as a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    /// Unique identifier.
    pub id: SessionDetailId,

    /// Earning party.
    pub tutor_id: UserId,

    /// Paying party.
    pub parent_id: UserId,

    /// Monthly shell this day belongs to.
    pub schedule_id: SessionScheduleId,

    /// Current status.
    pub status: SessionDetailStatus,

    /// When the day was checked in. Elapsed time is measured from here.
    pub created_at: Timestamp,

    /// When the status last changed.
    pub updated_at: Timestamp,
}

impl SessionDetail {
    /// Checks in a new session for today.
    pub fn check_in(tutor_id: UserId, parent_id: UserId, schedule_id: SessionScheduleId) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionDetailId::new(),
            tutor_id,
            parent_id,
            schedule_id,
            status: SessionDetailStatus::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once `duration` has elapsed since check-in, measured at `now`.
    pub fn is_due_for_completion(&self, duration: Duration, now: Timestamp) -> bool {
        let elapsed = now.duration_since(&self.created_at).num_seconds();
        elapsed >= 0 && elapsed as u64 >= duration.as_secs()
    }

    /// Completes the session.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.move_to(SessionDetailStatus::Completed)
    }

    /// Marks the day cancelled or a holiday.
    pub fn mark(&mut self, status: SessionDetailStatus) -> Result<(), DomainError> {
        self.move_to(status)
    }

    fn move_to(&mut self, target: SessionDetailStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Session day is already {:?}", self.status),
            )
        })?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
