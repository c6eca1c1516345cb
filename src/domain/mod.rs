//! Domain layer - aggregates, value objects, and state machines.

pub mod contract;
pub mod foundation;
pub mod offer;
pub mod payment;
pub mod session;
