//! Adapters - implementations of the ports.
//!
//! - `gateway` - HTTP payment gateway client and the scriptable test double
//! - `postgres` - sqlx-backed repositories
//! - `in_memory` - repository doubles for handler and workflow tests
//! - `notify` - notification sinks

pub mod gateway;
pub mod in_memory;
pub mod notify;
pub mod postgres;
