//! Offer persistence.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Amount, DomainError, ErrorCode, OfferId, Timestamp, UserId,
};
use crate::domain::offer::{LessonSchedule, Offer, OfferStatus};
use crate::ports::OfferRepository;

use super::db_error;

pub struct PostgresOfferRepository {
    pool: PgPool,
}

impl PostgresOfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    sender_id: String,
    receiver_id: String,
    child_name: String,
    subject: String,
    amount_monthly: i64,
    start_time: NaiveTime,
    end_time: NaiveTime,
    days_of_week: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_str(status: OfferStatus) -> &'static str {
    match status {
        OfferStatus::Pending => "pending",
        OfferStatus::Accepted => "accepted",
        OfferStatus::Rejected => "rejected",
    }
}

fn parse_status(value: &str) -> Result<OfferStatus, DomainError> {
    match value {
        "pending" => Ok(OfferStatus::Pending),
        "accepted" => Ok(OfferStatus::Accepted),
        "rejected" => Ok(OfferStatus::Rejected),
        other => Err(DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown offer status in storage: {}", other),
        )),
    }
}

fn days_to_strings(schedule: &LessonSchedule) -> Vec<String> {
    schedule.days_of_week.iter().map(|d| d.to_string()).collect()
}

impl TryFrom<OfferRow> for Offer {
    type Error = DomainError;

    fn try_from(row: OfferRow) -> Result<Self, Self::Error> {
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
        let schedule = LessonSchedule::new(row.start_time, row.end_time, days)?;

        Ok(Offer {
            id: OfferId::from_uuid(row.id),
            sender_id: UserId::new(row.sender_id)?,
            receiver_id: UserId::new(row.receiver_id)?,
            child_name: row.child_name,
            subject: row.subject,
            amount_monthly: Amount::from_minor_units(row.amount_monthly)?,
            schedule,
            status: parse_status(&row.status)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl OfferRepository for PostgresOfferRepository {
    async fn save(&self, offer: &Offer) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO offers (
                id, sender_id, receiver_id, child_name, subject, amount_monthly,
                start_time, end_time, days_of_week, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(offer.id.as_uuid())
        .bind(offer.sender_id.as_str())
        .bind(offer.receiver_id.as_str())
        .bind(&offer.child_name)
        .bind(&offer.subject)
        .bind(offer.amount_monthly.minor_units())
        .bind(offer.schedule.start_time)
        .bind(offer.schedule.end_time)
        .bind(days_to_strings(&offer.schedule))
        .bind(status_str(offer.status))
        .bind(offer.created_at.as_datetime())
        .bind(offer.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update(&self, offer: &Offer) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE offers
            SET status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(offer.id.as_uuid())
        .bind(status_str(offer.status))
        .bind(offer.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::OfferNotFound,
                format!("Offer not found: {}", offer.id),
            ));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &OfferId) -> Result<Option<Offer>, DomainError> {
        let row = sqlx::query_as::<_, OfferRow>("SELECT * FROM offers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(Offer::try_from).transpose()
    }
}
