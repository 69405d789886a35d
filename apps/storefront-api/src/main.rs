//! # Meridian Storefront API
//!
//! REST server backing the storefront and the admin panel.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront API Server                             │
//! │                                                                         │
//! │  Storefront ───► REST (8080) ───► Routes ───► meridian-core           │
//! │  Admin panel ──►                     │              │                   │
//! │                                      │              ▼                   │
//! │                                      │        meridian-db (SQLite)     │
//! │                                      ▼                                  │
//! │                            Payment / Shipment providers                │
//! │                            (reqwest, bounded timeouts)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod auth;
mod config;
mod error;
mod providers;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use meridian_core::AdminUser;
use meridian_db::{Database, DbConfig};

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::providers::payment::{PaymentClient, PaymentConfig};
use crate::providers::shipment::{ShipmentClient, ShipmentConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Meridian Storefront API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        "Configuration loaded"
    );

    // Connect to database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Connected to SQLite");

    // First-run admin bootstrap
    bootstrap_admin(&db, &config).await?;

    // Provider clients
    let provider_timeout = Duration::from_secs(config.provider_timeout_secs);

    let payment = PaymentClient::new(PaymentConfig {
        base_url: config.payment_base_url.clone(),
        key_id: config.payment_key_id.clone(),
        key_secret: config.payment_key_secret.clone(),
        timeout: provider_timeout,
    })?;

    let shipment = ShipmentClient::new(ShipmentConfig {
        base_url: config.shipment_base_url.clone(),
        email: config.shipment_email.clone(),
        password: config.shipment_password.clone(),
        timeout: provider_timeout,
    })?;

    // Shared state
    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
    let state = Arc::new(AppState {
        db,
        jwt,
        payment,
        shipment,
        config: config.clone(),
    });

    // Build and serve the router
    let app = routes::router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Creates the first admin account from ADMIN_EMAIL/ADMIN_PASSWORD when
/// the table is empty. Subsequent starts leave existing accounts alone.
async fn bootstrap_admin(
    db: &Database,
    config: &ApiConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if db.admin_users().count().await? > 0 {
        return Ok(());
    }

    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        warn!("No admin accounts exist and ADMIN_EMAIL/ADMIN_PASSWORD are unset; admin panel is unreachable");
        return Ok(());
    };

    let user = AdminUser {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: auth::hash_password(password).map_err(|e| e.message)?,
        role: "admin".to_string(),
        created_at: Utc::now(),
    };

    db.admin_users().insert(&user).await?;
    info!(email = %email, "Bootstrapped admin account");

    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
