//! Application layer - command handlers, per-contract serialization, and
//! the background loops with their scheduler.

pub mod handlers;
pub mod locks;
pub mod loops;
