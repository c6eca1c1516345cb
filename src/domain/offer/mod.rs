//! Offer - a tutoring proposal between a parent and a tutor.
//!
//! An offer carries the child, subject, monthly amount, and weekly lesson
//! schedule. Only the receiving party may accept or reject it; acceptance is
//! what starts the billed contract lifecycle.

mod aggregate;
mod schedule;
mod status;

pub use aggregate::Offer;
pub use schedule::LessonSchedule;
pub use status::OfferStatus;
