//! Storefront API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Storefront API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database path
    pub database_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Bootstrap admin email (first run only)
    pub admin_email: Option<String>,

    /// Bootstrap admin password (first run only)
    pub admin_password: Option<String>,

    /// Payment provider base URL
    pub payment_base_url: String,

    /// Payment provider key id (basic auth user)
    pub payment_key_id: String,

    /// Payment provider key secret (basic auth password)
    pub payment_key_secret: String,

    /// Shipment provider base URL
    pub shipment_base_url: String,

    /// Shipment provider account email
    pub shipment_email: String,

    /// Shipment provider account password
    pub shipment_password: String,

    /// Pickup postcode shipments originate from
    pub pickup_postcode: String,

    /// Bounded wait for any provider HTTP call, in seconds
    pub provider_timeout_secs: u64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./meridian.db".to_string()),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // Random-looking default for development
                // In production, this MUST be set via environment variable
                "meridian-dev-secret-change-in-production".to_string()
            }),

            jwt_access_lifetime_secs: env::var("JWT_ACCESS_LIFETIME_SECS")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hour
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()))?,

            admin_email: env::var("ADMIN_EMAIL").ok(),

            admin_password: env::var("ADMIN_PASSWORD").ok(),

            payment_base_url: env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| "https://api.payment.test".to_string()),

            payment_key_id: env::var("PAYMENT_KEY_ID").unwrap_or_default(),

            payment_key_secret: env::var("PAYMENT_KEY_SECRET").unwrap_or_default(),

            shipment_base_url: env::var("SHIPMENT_BASE_URL")
                .unwrap_or_else(|_| "https://api.shipment.test".to_string()),

            shipment_email: env::var("SHIPMENT_EMAIL").unwrap_or_default(),

            shipment_password: env::var("SHIPMENT_PASSWORD").unwrap_or_default(),

            pickup_postcode: env::var("PICKUP_POSTCODE")
                .unwrap_or_else(|_| "000000".to_string()),

            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PROVIDER_TIMEOUT_SECS".to_string()))?,
        };

        // Bootstrap credentials come as a pair or not at all
        if config.admin_email.is_some() != config.admin_password.is_some() {
            return Err(ConfigError::MissingRequired(
                "ADMIN_EMAIL and ADMIN_PASSWORD must be set together".to_string(),
            ));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load() {
        // With a clean env the defaults must produce a valid config
        let config = ApiConfig::load().unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.provider_timeout_secs, 15);
    }
}
