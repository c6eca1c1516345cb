//! Tutor day check-in.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::foundation::{
    DomainError, ErrorCode, SessionDetailId, SessionScheduleId, UserId,
};
use crate::domain::session::{ScheduleStatus, SessionDetail};
use crate::ports::{Notification, Notifier, SessionRepository};

/// Request to open today's session on a monthly schedule.
#[derive(Debug, Clone)]
pub struct CheckInSessionCommand {
    pub schedule_id: SessionScheduleId,
    pub actor: UserId,
}

/// Records the tutor starting a session for the current day.
///
/// The repository enforces one detail per (tutor, parent, schedule, day);
/// a second check-in on the same day surfaces as `DuplicateCheckIn`.
pub struct CheckInSessionHandler {
    sessions: Arc<dyn SessionRepository>,
    notifier: Arc<dyn Notifier>,
}

impl CheckInSessionHandler {
    pub fn new(sessions: Arc<dyn SessionRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { sessions, notifier }
    }

    pub async fn handle(
        &self,
        command: CheckInSessionCommand,
    ) -> Result<SessionDetailId, DomainError> {
        let schedule = self
            .sessions
            .find_schedule_by_id(&command.schedule_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ScheduleNotFound,
                    format!("Session schedule not found: {}", command.schedule_id),
                )
            })?;

        if command.actor != schedule.tutor_id {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Only the schedule's tutor may check in a session",
            ));
        }
        if schedule.status != ScheduleStatus::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Cannot check in on a cancelled schedule",
            ));
        }

        let detail = SessionDetail::check_in(
            schedule.tutor_id.clone(),
            schedule.parent_id.clone(),
            schedule.id,
        );
        self.sessions.save_detail(&detail).await?;

        info!(
            schedule_id = %schedule.id,
            detail_id = %detail.id,
            tutor_id = %schedule.tutor_id,
            "Session checked in"
        );

        self.notifier
            .notify(
                Notification::new(
                    schedule.parent_id.clone(),
                    "Session started",
                    format!("Today's session for {} has started", schedule.child_name),
                )
                .with_data(json!({ "session_detail_id": detail.id })),
            )
            .await;

        Ok(detail.id)
    }
}
