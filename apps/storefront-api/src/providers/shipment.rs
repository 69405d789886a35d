//! # Shipment Provider Client
//!
//! Wrapper around the shipment carrier's API: token exchange,
//! serviceability lookup, shipment creation.
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Shipment Auth Token Cache                             │
//! │                                                                         │
//! │  ┌────────────────┐     ┌─────────────────┐                            │
//! │  │ ShipmentClient │     │  Carrier API    │                            │
//! │  └───────┬────────┘     └────────┬────────┘                            │
//! │          │                       │                                     │
//! │          │  1. POST /auth/login  │                                     │
//! │          │    (email, password)  │                                     │
//! │          │──────────────────────►│                                     │
//! │          │  2. token + expiry    │                                     │
//! │          │◄──────────────────────│                                     │
//! │          │                       │                                     │
//! │          │  [cached in-process: value + expiry, nothing else]          │
//! │          │                       │                                     │
//! │          │  [near expiry: transparently re-login]                      │
//! │          │                       │                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is an explicit object owned by this client and injected with
//! it — not process-global state. A cold process starts with an empty
//! cache and refetches on first use. Expiry is the only invalidation.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ProviderError;

/// Margin before token expiration to trigger refresh (5 minutes)
const REFRESH_MARGIN_SECS: u64 = 300;

/// A cached carrier token.
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The bearer token value
    pub token: String,
    /// When the token expires (local monotonic time)
    pub expires_at: Instant,
}

impl CachedToken {
    /// Check if the token is expired or about to expire.
    pub fn needs_refresh(&self) -> bool {
        let margin = Duration::from_secs(REFRESH_MARGIN_SECS);
        Instant::now() + margin >= self.expires_at
    }

    /// Get remaining valid time in seconds.
    pub fn remaining_secs(&self) -> u64 {
        let now = Instant::now();
        if now >= self.expires_at {
            0
        } else {
            (self.expires_at - now).as_secs()
        }
    }
}

/// Shipment provider configuration.
#[derive(Debug, Clone)]
pub struct ShipmentConfig {
    /// Base URL, e.g. "https://api.shipment.example"
    pub base_url: String,
    /// Carrier account email
    pub email: String,
    /// Carrier account password
    pub password: String,
    /// Bounded wait for any call
    pub timeout: Duration,
}

/// Login response from the carrier.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    /// Token lifetime in seconds
    expires_in: u64,
}

/// A serviceability verdict for a delivery route.
#[derive(Debug, Clone, Deserialize)]
pub struct Serviceability {
    /// Whether any courier covers the route.
    pub serviceable: bool,
    /// Courier the carrier recommends, when serviceable.
    pub courier: Option<String>,
    /// Estimated delivery days, when available.
    pub estimated_days: Option<u32>,
}

/// A created shipment as the carrier reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderShipment {
    /// Carrier-side shipment identifier.
    pub shipment_id: String,
    /// Courier assigned to the shipment.
    pub courier: Option<String>,
}

/// Request body for shipment creation.
#[derive(Debug, Serialize)]
struct CreateShipmentRequest<'a> {
    order_number: &'a str,
    amount_cents: i64,
    pickup_postcode: &'a str,
    delivery_postcode: &'a str,
    weight_grams: u32,
}

/// Client for the shipment provider, carrying its own token cache.
pub struct ShipmentClient {
    http: reqwest::Client,
    config: ShipmentConfig,
    /// Current token (None until first use or after a failed refresh)
    token: RwLock<Option<CachedToken>>,
}

impl ShipmentClient {
    /// Creates a new client with an empty token cache.
    pub fn new(config: ShipmentConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build client: {}", e)))?;

        Ok(ShipmentClient {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    /// Get a valid token, logging in or refreshing as needed.
    ///
    /// ## Flow
    /// 1. If the cached token is fresh, use it
    /// 2. Otherwise re-login (the carrier has no refresh grant; a new
    ///    login replaces the token)
    pub async fn get_token(&self) -> Result<String, ProviderError> {
        // Fast path under the read lock
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if !token.needs_refresh() {
                    debug!(remaining_secs = token.remaining_secs(), "Using cached carrier token");
                    return Ok(token.token.clone());
                }
            }
        }

        let mut guard = self.token.write().await;

        // Double-check after acquiring the write lock
        if let Some(token) = guard.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.login().await?;
        info!(
            expires_in_secs = fresh.remaining_secs(),
            "Authenticated with shipment provider"
        );
        let value = fresh.token.clone();
        *guard = Some(fresh);

        Ok(value)
    }

    /// Exchanges account credentials for a token.
    async fn login(&self) -> Result<CachedToken, ProviderError> {
        debug!(url = %self.config.base_url, "Logging in to shipment provider");

        let response = self
            .http
            .post(format!("{}/v1/auth/login", self.config.base_url))
            .json(&serde_json::json!({
                "email": self.config.email,
                "password": self.config.password,
            }))
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Carrier login failed");
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;

        Ok(CachedToken {
            token: body.token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    /// Checks whether a route is serviceable.
    pub async fn check_serviceability(
        &self,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight_grams: u32,
    ) -> Result<Serviceability, ProviderError> {
        let token = self.get_token().await?;

        let response = self
            .http
            .get(format!("{}/v1/serviceability", self.config.base_url))
            .bearer_auth(&token)
            .query(&[
                ("pickup_postcode", pickup_postcode),
                ("delivery_postcode", delivery_postcode),
                ("weight_grams", &weight_grams.to_string()),
            ])
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Serviceability>()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }

    /// Creates a shipment for a paid order.
    pub async fn create_shipment(
        &self,
        order_number: &str,
        amount_cents: i64,
        pickup_postcode: &str,
        delivery_postcode: &str,
        weight_grams: u32,
    ) -> Result<ProviderShipment, ProviderError> {
        let token = self.get_token().await?;

        debug!(order_number, delivery_postcode, "Creating shipment");

        let response = self
            .http
            .post(format!("{}/v1/shipments", self.config.base_url))
            .bearer_auth(&token)
            .json(&CreateShipmentRequest {
                order_number,
                amount_cents,
                pickup_postcode,
                delivery_postcode,
                weight_grams,
            })
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ProviderShipment>()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }

    /// Seeds the cache directly. Test hook: lets cache behavior be
    /// exercised without a live carrier.
    #[cfg(test)]
    pub async fn set_token_for_test(&self, token: CachedToken) {
        *self.token.write().await = Some(token);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ShipmentClient {
        ShipmentClient::new(ShipmentConfig {
            base_url: "http://localhost:9".to_string(),
            email: "shop@example.com".to_string(),
            password: "secret".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_fresh_token_not_refreshed() {
        let token = CachedToken {
            token: "abc".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        // 1 hour left, 5 minute margin: no refresh
        assert!(!token.needs_refresh());
    }

    #[test]
    fn test_stale_token_needs_refresh() {
        let token = CachedToken {
            token: "abc".to_string(),
            expires_at: Instant::now() + Duration::from_secs(60),
        };
        // 1 minute left, 5 minute margin: refresh
        assert!(token.needs_refresh());
        assert!(token.remaining_secs() <= 60);
    }

    #[tokio::test]
    async fn test_cached_token_reused() {
        let client = test_client();
        client
            .set_token_for_test(CachedToken {
                token: "cached-token".to_string(),
                expires_at: Instant::now() + Duration::from_secs(3600),
            })
            .await;

        // A fresh cached token is returned without any network call
        // (the base_url above is unroutable, so a login attempt would fail)
        let token = client.get_token().await.unwrap();
        assert_eq!(token, "cached-token");
    }

    #[tokio::test]
    async fn test_cold_cache_requires_login() {
        let client = test_client();

        // Empty cache + unreachable carrier = Unavailable, not a panic
        // and not a silent success
        let err = client.get_token().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
