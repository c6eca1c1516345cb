//! Session schedule and detail persistence.
//!
//! The one-detail-per-day rule is a unique index over
//! (tutor_id, parent_id, schedule_id, created_at::date); its violation maps
//! to `DuplicateCheckIn`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, OfferId, SessionDetailId, SessionScheduleId, Timestamp, UserId,
};
use crate::domain::offer::LessonSchedule;
use crate::domain::session::{
    ScheduleStatus, SessionDetail, SessionDetailStatus, SessionSchedule,
};
use crate::ports::SessionRepository;

use super::{db_error, is_unique_violation};

pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    tutor_id: String,
    parent_id: String,
    offer_id: Uuid,
    child_name: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    days_of_week: Vec<String>,
    total_sessions: i32,
    sessions_completed: i32,
    status: String,
    month: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: Uuid,
    tutor_id: String,
    parent_id: String,
    schedule_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn schedule_status_str(status: ScheduleStatus) -> &'static str {
    match status {
        ScheduleStatus::Active => "active",
        ScheduleStatus::Cancelled => "cancelled",
    }
}

fn parse_schedule_status(value: &str) -> Result<ScheduleStatus, DomainError> {
    match value {
        "active" => Ok(ScheduleStatus::Active),
        "cancelled" => Ok(ScheduleStatus::Cancelled),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown schedule status in storage: {}", other),
        )),
    }
}

fn detail_status_str(status: SessionDetailStatus) -> &'static str {
    match status {
        SessionDetailStatus::Created => "CREATED",
        SessionDetailStatus::Completed => "COMPLETED",
        SessionDetailStatus::CancelledByTutor => "CANCELLED_BY_TUTOR",
        SessionDetailStatus::CancelledByParent => "CANCELLED_BY_PARENT",
        SessionDetailStatus::TutorHoliday => "TUTOR_HOLIDAY",
        SessionDetailStatus::PublicHoliday => "PUBLIC_HOLIDAY",
    }
}

fn parse_detail_status(value: &str) -> Result<SessionDetailStatus, DomainError> {
    match value {
        "CREATED" => Ok(SessionDetailStatus::Created),
        "COMPLETED" => Ok(SessionDetailStatus::Completed),
        "CANCELLED_BY_TUTOR" => Ok(SessionDetailStatus::CancelledByTutor),
        "CANCELLED_BY_PARENT" => Ok(SessionDetailStatus::CancelledByParent),
        "TUTOR_HOLIDAY" => Ok(SessionDetailStatus::TutorHoliday),
        "PUBLIC_HOLIDAY" => Ok(SessionDetailStatus::PublicHoliday),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown session detail status in storage: {}", other),
        )),
    }
}

impl TryFrom<ScheduleRow> for SessionSchedule {
    type Error = DomainError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let days: Vec<Weekday> = row
            .days_of_week
            .iter()
            .map(|d| {
                d.parse::<Weekday>().map_err(|_| {
                    DomainError::new(
                        ErrorCode::InternalError,
                        format!("Unknown weekday in storage: {}", d),
                    )
                })
            })
            .collect::<Result<_, _>>()?;
        let lesson_schedule = LessonSchedule::new(row.start_time, row.end_time, days)?;

        Ok(SessionSchedule {
            id: SessionScheduleId::from_uuid(row.id),
            tutor_id: UserId::new(row.tutor_id)?,
            parent_id: UserId::new(row.parent_id)?,
            offer_id: OfferId::from_uuid(row.offer_id),
            child_name: row.child_name,
            lesson_schedule,
            total_sessions: row.total_sessions as u32,
            sessions_completed: row.sessions_completed as u32,
            status: parse_schedule_status(&row.status)?,
            month: row.month,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

impl TryFrom<DetailRow> for SessionDetail {
    type Error = DomainError;

    fn try_from(row: DetailRow) -> Result<Self, Self::Error> {
        Ok(SessionDetail {
            id: SessionDetailId::from_uuid(row.id),
            tutor_id: UserId::new(row.tutor_id)?,
            parent_id: UserId::new(row.parent_id)?,
            schedule_id: SessionScheduleId::from_uuid(row.schedule_id),
            status: parse_detail_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn save_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError> {
        let days: Vec<String> = schedule
            .lesson_schedule
            .days_of_week
            .iter()
            .map(|d| d.to_string())
            .collect();
        sqlx::query(
            r#"
            INSERT INTO session_schedules (
                id, tutor_id, parent_id, offer_id, child_name, start_time,
                end_time, days_of_week, total_sessions, sessions_completed,
                status, month, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(schedule.id.as_uuid())
        .bind(schedule.tutor_id.as_str())
        .bind(schedule.parent_id.as_str())
        .bind(schedule.offer_id.as_uuid())
        .bind(&schedule.child_name)
        .bind(schedule.lesson_schedule.start_time)
        .bind(schedule.lesson_schedule.end_time)
        .bind(days)
        .bind(schedule.total_sessions as i32)
        .bind(schedule.sessions_completed as i32)
        .bind(schedule_status_str(schedule.status))
        .bind(&schedule.month)
        .bind(schedule.created_at.as_datetime())
        .bind(schedule.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_schedule(&self, schedule: &SessionSchedule) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE session_schedules
            SET sessions_completed = $2, status = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(schedule.id.as_uuid())
        .bind(schedule.sessions_completed as i32)
        .bind(schedule_status_str(schedule.status))
        .bind(schedule.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ScheduleNotFound,
                format!("Session schedule not found: {}", schedule.id),
            ));
        }
        Ok(())
    }

    async fn find_schedule_by_id(
        &self,
        id: &SessionScheduleId,
    ) -> Result<Option<SessionSchedule>, DomainError> {
        let row =
            sqlx::query_as::<_, ScheduleRow>("SELECT * FROM session_schedules WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;
        row.map(SessionSchedule::try_from).transpose()
    }

    async fn find_schedule_for_month(
        &self,
        tutor_id: &UserId,
        parent_id: &UserId,
        offer_id: &OfferId,
        month: &str,
    ) -> Result<Option<SessionSchedule>, DomainError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            r#"
            SELECT * FROM session_schedules
            WHERE tutor_id = $1 AND parent_id = $2 AND offer_id = $3 AND month = $4
            "#,
        )
        .bind(tutor_id.as_str())
        .bind(parent_id.as_str())
        .bind(offer_id.as_uuid())
        .bind(month)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(SessionSchedule::try_from).transpose()
    }

    async fn find_active_schedules_for_offer(
        &self,
        offer_id: &OfferId,
    ) -> Result<Vec<SessionSchedule>, DomainError> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT * FROM session_schedules WHERE offer_id = $1 AND status = 'active'",
        )
        .bind(offer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(SessionSchedule::try_from).collect()
    }

    async fn save_detail(&self, detail: &SessionDetail) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO session_details (
                id, tutor_id, parent_id, schedule_id, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(detail.id.as_uuid())
        .bind(detail.tutor_id.as_str())
        .bind(detail.parent_id.as_str())
        .bind(detail.schedule_id.as_uuid())
        .bind(detail_status_str(detail.status))
        .bind(detail.created_at.as_datetime())
        .bind(detail.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::new(
                    ErrorCode::DuplicateCheckIn,
                    "A session is already checked in for today",
                )
            } else {
                db_error(e)
            }
        })?;
        Ok(())
    }

    async fn update_detail(&self, detail: &SessionDetail) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE session_details
            SET status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(detail.id.as_uuid())
        .bind(detail_status_str(detail.status))
        .bind(detail.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ScheduleNotFound,
                format!("Session detail not found: {}", detail.id),
            ));
        }
        Ok(())
    }

    async fn find_detail_by_id(
        &self,
        id: &SessionDetailId,
    ) -> Result<Option<SessionDetail>, DomainError> {
        let row = sqlx::query_as::<_, DetailRow>("SELECT * FROM session_details WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(SessionDetail::try_from).transpose()
    }

    async fn find_open_details(&self, limit: u32) -> Result<Vec<SessionDetail>, DomainError> {
        let rows = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT * FROM session_details
            WHERE status = 'CREATED'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(SessionDetail::try_from).collect()
    }
}
