use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Datelike;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    DomainError, ErrorCode, OfferId, SessionDetailId, SessionScheduleId, UserId,
};
use crate::domain::session::{ScheduleStatus, SessionDetail, SessionDetailStatus, SessionSchedule};
use crate::ports::SessionRepository;

#[derive(Default)]
pub struct InMemorySessionRepository {
    schedules: RwLock<HashMap<SessionScheduleId, SessionSchedule>>,
    details: RwLock<HashMap<SessionDetailId, SessionDetail>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_calendar_day(a: &SessionDetail, b: &SessionDetail) -> bool {
    let (a, b) = (a.created_at.as_datetime(), b.created_at.as_datetime());
    a.year() == b.year() && a.ordinal() == b.ordinal()
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn save_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError> {
        let mut schedules = self.schedules.write().await;
        let exists = schedules.values().any(|s| {
            s.tutor_id == schedule.tutor_id
                && s.parent_id == schedule.parent_id
                && s.offer_id == schedule.offer_id
                && s.month == schedule.month
        });
        if exists {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Schedule already exists for month {}", schedule.month),
            ));
        }
        schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn update_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError> {
        let mut schedules = self.schedules.write().await;
        if !schedules.contains_key(&schedule.id) {
            return Err(DomainError::new(
                ErrorCode::ScheduleNotFound,
                format!("Session schedule not found: {}", schedule.id),
            ));
        }
        schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn find_schedule_by_id(
        &self,
        id: &SessionScheduleId,
    ) -> Result<Option<SessionSchedule>, DomainError> {
        Ok(self.schedules.read().await.get(id).cloned())
    }

    async fn find_schedule_for_month(
        &self,
        tutor_id: &UserId,
        parent_id: &UserId,
        offer_id: &OfferId,
        month: &str,
    ) -> Result<Option<SessionSchedule>, DomainError> {
        Ok(self
            .schedules
            .read()
            .await
            .values()
            .find(|s| {
                &s.tutor_id == tutor_id
                    && &s.parent_id == parent_id
                    && &s.offer_id == offer_id
                    && s.month == month
            })
            .cloned())
    }

    async fn find_active_schedules_for_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<SessionSchedule>, DomainError> {
        Ok(self
            .schedules
            .read()
            .await
            .values()
            .filter(|s| &s.offer_id == offer_id && s.status == ScheduleStatus::Active)
            .cloned()
            .collect())
    }

    async fn save_detail(&self, detail: &SessionDetail) -> Result<(), DomainError> {
        let mut details = self.details.write().await;
        let duplicate = details.values().any(|d| {
            d.tutor_id == detail.tutor_id
                && d.parent_id == detail.parent_id
                && d.schedule_id == detail.schedule_id
                && same_calendar_day(d, detail)
        });
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::DuplicateCheckIn,
                "A session is already checked in for today",
            ));
        }
        details.insert(detail.id, detail.clone());
        Ok(())
    }

    async fn update_detail(&self, detail: &SessionDetail) -> Result<(), DomainError> {
        let mut details = self.details.write().await;
        if !details.contains_key(&detail.id) {
            return Err(DomainError::new(
                ErrorCode::ScheduleNotFound,
                format!("Session detail not found: {}", detail.id),
            ));
        }
        details.insert(detail.id, detail.clone());
        Ok(())
    }

    async fn find_detail_by_id(
        &self,
        id: &SessionDetailId,
    ) -> Result<Option<SessionDetail>, DomainError> {
        Ok(self.details.read().await.get(id).cloned())
    }

    async fn find_open_details(&self, limit: u32) -> Result<Vec<SessionDetail>, DomainError> {
        let mut open: Vec<SessionDetail> = self
            .details
            .read()
            .await
            .values()
            .filter(|d| d.status == SessionDetailStatus::Created)
            .cloned()
            .collect();
        open.sort_by_key(|d| d.created_at);
        open.truncate(limit as usize);
        Ok(open)
    }
}
