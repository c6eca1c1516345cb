//! Server configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Server configuration
///
/// The HTTP surface itself lives outside this crate; this section carries
/// the environment name and log filter the process is started with.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Environment name
    #[serde(default)]
    pub environment: Environment,

    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Application environment
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl ServerConfig {
    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Validate server configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.log_level.is_empty() {
            return Err(ValidationError::MissingRequired("SERVER__LOG_LEVEL"));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info,tutorlink=debug".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_development() {
        let config = ServerConfig::default();
        assert!(!config.is_production());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_log_level_rejected() {
        let config = ServerConfig {
            log_level: String::new(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
