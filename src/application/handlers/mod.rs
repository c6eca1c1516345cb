//! Command handlers - one struct per use case, wired with ports.

pub mod contract;
pub mod payment;
pub mod session;
