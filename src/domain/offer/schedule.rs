//! Weekly lesson schedule value object.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::ValidationError;

/// The agreed weekly schedule: lesson start/end times and days of the week.
///
/// The end time must be after the start time; overnight lessons are not
/// supported. The per-lesson duration derived here drives automatic
/// session completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSchedule {
    /// Lesson start time (local wall clock, timezone handled upstream).
    pub start_time: NaiveTime,

    /// Lesson end time.
    pub end_time: NaiveTime,

    /// Days of the week lessons take place.
    pub days_of_week: Vec<Weekday>,
}

impl LessonSchedule {
    /// Creates a schedule, validating the time window and day list.
    pub fn new(
        start_time: NaiveTime,
        end_time: NaiveTime,
        days_of_week: Vec<Weekday>,
    ) -> Result<Self, ValidationError> {
        if end_time <= start_time {
            return Err(ValidationError::invalid_format(
                "schedule",
                "end_time must be after start_time",
            ));
        }
        if days_of_week.is_empty() {
            return Err(ValidationError::empty_field("days_of_week"));
        }
        Ok(Self {
            start_time,
            end_time,
            days_of_week,
        })
    }

    /// Duration of a single lesson.
    pub fn session_duration(&self) -> Duration {
        let secs = (self.end_time - self.start_time).num_seconds();
        // new() guarantees end > start
        Duration::from_secs(secs as u64)
    }

    /// Number of lesson days per week.
    pub fn days_per_week(&self) -> usize {
        self.days_of_week.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn derives_session_duration() {
        let schedule =
            LessonSchedule::new(t(16, 0), t(17, 30), vec![Weekday::Mon, Weekday::Wed]).unwrap();
        assert_eq!(schedule.session_duration(), Duration::from_secs(90 * 60));
        assert_eq!(schedule.days_per_week(), 2);
    }

    #[test]
    fn rejects_inverted_window() {
        assert!(LessonSchedule::new(t(17, 0), t(16, 0), vec![Weekday::Mon]).is_err());
        assert!(LessonSchedule::new(t(16, 0), t(16, 0), vec![Weekday::Mon]).is_err());
    }

    #[test]
    fn rejects_empty_day_list() {
        assert!(LessonSchedule::new(t(16, 0), t(17, 0), vec![]).is_err());
    }
}
