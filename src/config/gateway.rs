//! Payment gateway configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::payment::BasketPrefixes;

/// Payment gateway configuration (merchant credentials and endpoints).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant identifier issued by the gateway.
    pub merchant_id: String,

    /// Merchant display name sent on charge requests.
    pub merchant_name: String,

    /// Shared secret used for request signing and notification hashes.
    pub secret_key: SecretString,

    /// Gateway API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// ISO currency code sent on charge requests.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Request timeout in seconds for all gateway calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Basket-id prefix for first-time charges.
    #[serde(default = "default_initial_prefix")]
    pub initial_basket_prefix: String,

    /// Basket-id prefix for recurring charges.
    #[serde(default = "default_recurring_prefix")]
    pub recurring_basket_prefix: String,

    /// URL the gateway redirects to after successful checkout.
    pub success_url: String,

    /// URL the gateway redirects to after failed checkout.
    pub failure_url: String,

    /// Checkout cancel/back URL.
    pub checkout_url: String,
}

impl GatewayConfig {
    /// Shared secret as a string slice.
    pub fn secret(&self) -> &str {
        self.secret_key.expose_secret()
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured basket-prefix table.
    pub fn basket_prefixes(&self) -> BasketPrefixes {
        BasketPrefixes {
            initial: self.initial_basket_prefix.clone(),
            recurring: self.recurring_basket_prefix.clone(),
        }
    }

    /// Validate gateway configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.merchant_id.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__MERCHANT_ID"));
        }
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY__SECRET_KEY"));
        }
        if !self.base_url.starts_with("https://") {
            return Err(ValidationError::GatewayUrlMustBeHttps);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        if self.initial_basket_prefix.is_empty()
            || self.recurring_basket_prefix.is_empty()
            || self.initial_basket_prefix == self.recurring_basket_prefix
        {
            return Err(ValidationError::InvalidBasketPrefixes);
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://gateway.example.com".to_string()
}

fn default_currency() -> String {
    "PKR".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_initial_prefix() -> String {
    "SUB-".to_string()
}

fn default_recurring_prefix() -> String {
    "RECUR-".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig {
            merchant_id: "MERCHANT01".to_string(),
            merchant_name: "TutorLink".to_string(),
            secret_key: SecretString::new("shared-secret".to_string()),
            base_url: default_base_url(),
            currency: default_currency(),
            request_timeout_secs: default_request_timeout(),
            initial_basket_prefix: default_initial_prefix(),
            recurring_basket_prefix: default_recurring_prefix(),
            success_url: "https://app.example.com/pay/success".to_string(),
            failure_url: "https://app.example.com/pay/failure".to_string(),
            checkout_url: "https://app.example.com/pay/checkout".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn rejects_plain_http_base_url() {
        let mut c = config();
        c.base_url = "http://gateway.example.com".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_identical_basket_prefixes() {
        let mut c = config();
        c.recurring_basket_prefix = c.initial_basket_prefix.clone();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut c = config();
        c.request_timeout_secs = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn prefix_table_reflects_config() {
        let mut c = config();
        c.initial_basket_prefix = "FIRST-".to_string();
        let prefixes = c.basket_prefixes();
        assert_eq!(prefixes.initial, "FIRST-");
        assert_eq!(prefixes.recurring, "RECUR-");
    }
}
