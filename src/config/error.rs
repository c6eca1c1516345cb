//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Gateway base URL must use HTTPS")]
    GatewayUrlMustBeHttps,

    #[error("Gateway request timeout must be non-zero")]
    InvalidGatewayTimeout,

    #[error("Basket prefixes must be non-empty and distinct")]
    InvalidBasketPrefixes,

    #[error("Scheduler interval must be non-zero")]
    InvalidSchedulerInterval,
}
