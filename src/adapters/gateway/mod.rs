//! Payment gateway adapters.

mod client;
mod mock;

pub use client::HttpGatewayClient;
pub use mock::MockGateway;
