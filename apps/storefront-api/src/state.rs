//! Shared application state for the Storefront API.
//!
//! One `Arc<AppState>` is built at startup and handed to every handler
//! via axum's `State` extractor. The provider clients live here so their
//! caches (the shipment token) are per-process and dependency-injected,
//! never global.

use meridian_db::Database;

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::providers::payment::PaymentClient;
use crate::providers::shipment::ShipmentClient;

/// Shared application state.
pub struct AppState {
    /// Database handle (cheap to clone, pooled underneath)
    pub db: Database,
    /// Token signing/validation
    pub jwt: JwtManager,
    /// Payment provider client
    pub payment: PaymentClient,
    /// Shipment provider client (owns the auth token cache)
    pub shipment: ShipmentClient,
    /// Loaded configuration
    pub config: ApiConfig,
}
