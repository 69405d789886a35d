//! # Session & Login Routes
//!
//! Issues the JWTs the rest of the surface checks: anonymous customer
//! sessions for the storefront, credentialed logins for the admin panel.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{verify_password, ROLE_ADMIN, ROLE_CUSTOMER};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in_secs: i64,
}

/// `POST /auth/session` - issues an anonymous customer session token.
///
/// The storefront calls this once per visitor; the returned token gates
/// the mutating endpoints (apply, redeem, checkout).
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let session_id = Uuid::new_v4().to_string();
    let token = state.jwt.generate_token(&session_id, ROLE_CUSTOMER)?;

    Ok(Json(TokenResponse {
        token,
        expires_in_secs: state.config.jwt_access_lifetime_secs,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /admin/login` - exchanges admin credentials for a token.
///
/// Unknown email and wrong password produce the identical error, so the
/// endpoint doesn't leak which emails have accounts.
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .db
        .admin_users()
        .get_by_email(req.email.trim())
        .await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!(email = %req.email, "Failed admin login attempt");
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
    };

    let token = state.jwt.generate_token(&user.id, ROLE_ADMIN)?;
    info!(admin = %user.email, "Admin logged in");

    Ok(Json(TokenResponse {
        token,
        expires_in_secs: state.config.jwt_access_lifetime_secs,
    }))
}
