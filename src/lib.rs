//! TutorLink - Subscription and payment lifecycle engine for a tutoring marketplace.
//!
//! A parent and a tutor agree to an [`Offer`](domain::offer::Offer); the
//! agreement becomes a billed, recurring [`Contract`](domain::contract::Contract)
//! whose lifecycle spans payment collection, session delivery, and dispute
//! resolution. Money moves before sessions and tutor balances are created,
//! gateway notifications may be lost or duplicated, and contract closure needs
//! agreement from both parties.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
