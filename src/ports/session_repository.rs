//! Session repository port - monthly shells and day-level instances.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OfferId, SessionDetailId, SessionScheduleId, UserId};
use crate::domain::session::{SessionDetail, SessionSchedule};

/// Repository port for session schedules and day-level details.
///
/// Implementations enforce the uniqueness keys the provisioner and check-in
/// paths depend on: one schedule per (tutor, parent, offer, month) and one
/// detail per (tutor, parent, schedule, calendar day).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Save a new monthly shell.
    async fn save_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError>;

    /// Update an existing shell.
    async fn update_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError>;

    /// Find a shell by id.
    async fn find_schedule_by_id(
        &self,
        id: &SessionScheduleId,
    ) -> Result<Option<SessionSchedule>, DomainError>;

    /// Find the shell for one billing month of a contract.
    async fn find_schedule_for_month(
        &self,
        tutor_id: &UserId,
        parent_id: &UserId,
        offer_id: &OfferId,
        month: &str,
    ) -> Result<Option<SessionSchedule>, DomainError>;

    /// All active shells for an offer (used when closure deactivates them).
    async fn find_active_schedules_for_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<SessionSchedule>, DomainError>;

    /// Save a new day-level instance.
    ///
    /// # Errors
    ///
    /// - `DuplicateCheckIn` if a detail already exists for the same
    ///   (tutor, parent, schedule, calendar day)
    async fn save_detail(&self, detail: &SessionDetail) -> Result<(), DomainError>;

    /// Update a day-level instance.
    async fn update_detail(&self, detail: &SessionDetail) -> Result<(), DomainError>;

    /// Find a day-level instance by id.
    async fn find_detail_by_id(
        &self,
        id: &SessionDetailId,
    ) -> Result<Option<SessionDetail>, DomainError>;

    /// All day-level instances still awaiting completion, oldest first.
    async fn find_open_details(&self, limit: u32) -> Result<Vec<SessionDetail>, DomainError>;
}
