//! Session - the recurring schedule shell and its day-level instances.
//!
//! A `SessionSchedule` row exists per billing month per contract; day-level
//! `SessionDetail` rows are checked in per lesson day and auto-completed by
//! the session-completion loop once their scheduled duration has elapsed.

mod detail;
mod schedule;

pub use detail::{SessionDetail, SessionDetailStatus};
pub use schedule::{ScheduleStatus, SessionSchedule};
