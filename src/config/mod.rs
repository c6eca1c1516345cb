//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `TUTORLINK` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use tutorlink::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod gateway;
mod scheduler;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use scheduler::SchedulerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (environment, log level)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment gateway configuration (merchant credentials, endpoints)
    pub gateway: GatewayConfig,

    /// Background loop intervals
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// 1. Loads a `.env` file if present (development convenience)
    /// 2. Reads environment variables with the `TUTORLINK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `TUTORLINK__DATABASE__URL=...` -> `database.url`
    /// - `TUTORLINK__GATEWAY__MERCHANT_ID=...` -> `gateway.merchant_id`
    /// - `TUTORLINK__SCHEDULER__RECONCILE_INTERVAL_SECS=600`
    pub fn load() -> Result<Self, ConfigError> {
        // Ignore a missing .env; production supplies real env vars.
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TUTORLINK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Validate every configuration section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}
