//! # Payment Provider Client
//!
//! Wrapper around the payment gateway's order API.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Payment Flow                                      │
//! │                                                                         │
//! │  Checkout ──► create_order(total) ──► provider order id + amount       │
//! │                                            │                            │
//! │                  (client-side handler collects the payment)            │
//! │                                            │                            │
//! │  Confirm  ──► fetch_status(id) ──► must be captured, amount must       │
//! │               match the persisted order total, or the order stays      │
//! │               pending                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The amount cross-check at confirm time is the server-side guard: the
//! client's success callback alone is never trusted.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::ProviderError;

/// Payment provider configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Base URL, e.g. "https://api.payment.example"
    pub base_url: String,
    /// Key id (basic auth user)
    pub key_id: String,
    /// Key secret (basic auth password)
    pub key_secret: String,
    /// Bounded wait for any call
    pub timeout: Duration,
}

/// An order as the provider sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderOrder {
    /// Provider-side order identifier.
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO currency code.
    pub currency: String,
    /// Provider-side status string.
    pub status: String,
}

impl ProviderOrder {
    /// Whether the provider reports the payment as collected.
    ///
    /// Only an explicit paid/captured status counts; "created" or
    /// "attempted" do not.
    pub fn is_captured(&self) -> bool {
        matches!(self.status.as_str(), "paid" | "captured")
    }
}

/// Request body for order creation.
#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Client for the payment provider.
pub struct PaymentClient {
    http: reqwest::Client,
    config: PaymentConfig,
}

impl PaymentClient {
    /// Creates a new client with bounded timeouts.
    pub fn new(config: PaymentConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("failed to build client: {}", e)))?;

        Ok(PaymentClient { http, config })
    }

    /// Creates a provider order for the given amount.
    ///
    /// ## Arguments
    /// * `amount_cents` - order total in minor units
    /// * `currency` - ISO code, e.g. "USD"
    /// * `receipt` - our order number, echoed back by the provider
    pub async fn create_order(
        &self,
        amount_cents: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<ProviderOrder, ProviderError> {
        debug!(amount_cents, receipt, "Creating provider payment order");

        let response = self
            .http
            .post(format!("{}/v1/orders", self.config.base_url))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&CreateOrderRequest {
                amount: amount_cents,
                currency,
                receipt,
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
            .json::<ProviderOrder>()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }

    /// Fetches the current status of a provider order.
    pub async fn fetch_order(&self, provider_order_id: &str) -> Result<ProviderOrder, ProviderError> {
        debug!(provider_order_id, "Fetching provider payment order");

        let response = self
            .http
            .get(format!(
                "{}/v1/orders/{}",
                self.config.base_url, provider_order_id
            ))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
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
            .json::<ProviderOrder>()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_statuses() {
        let mut order = ProviderOrder {
            id: "prov_1".to_string(),
            amount: 1800,
            currency: "USD".to_string(),
            status: "created".to_string(),
        };
        assert!(!order.is_captured());

        order.status = "attempted".to_string();
        assert!(!order.is_captured());

        order.status = "paid".to_string();
        assert!(order.is_captured());

        order.status = "captured".to_string();
        assert!(order.is_captured());
    }
}
