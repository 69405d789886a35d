//! # Gift Card Routes
//!
//! Redemption is the simpler sibling of coupon apply: the handler
//! produces precise errors (expired, inactive, insufficient), then the
//! repository's conditional decrement is the last line of defense
//! against concurrent depletion.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use meridian_core::{normalize_code, validation, CoreError, OrderStatus};
use meridian_db::GiftCardRedeemOutcome;

use crate::auth::SessionAuth;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Redeem
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RedeemGiftCardRequest {
    pub code: String,
    pub amount_cents: i64,
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemGiftCardResponse {
    pub redeemed: bool,
    pub balance_cents: i64,
}

/// `POST /gift-cards/redeem` - consumes value from a gift card for an order.
pub async fn redeem_gift_card(
    SessionAuth(session): SessionAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RedeemGiftCardRequest>,
) -> Result<Json<RedeemGiftCardResponse>, ApiError> {
    validation::validate_code(&req.code)?;
    validation::validate_amount_cents(req.amount_cents)?;

    let code = normalize_code(&req.code);
    debug!(session = %session.sub, code = %code, amount_cents = req.amount_cents, "Redeem gift card");

    let card = state
        .db
        .gift_cards()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::GiftCardNotFound(code.clone())))?;

    let now = Utc::now();
    if card.is_expired(now) {
        return Err(CoreError::GiftCardExpired(code).into());
    }
    if !card.is_active {
        return Err(CoreError::GiftCardInactive(code).into());
    }
    if req.amount_cents > card.balance_cents {
        return Err(CoreError::InsufficientBalance {
            requested_cents: req.amount_cents,
            balance_cents: card.balance_cents,
        }
        .into());
    }

    let order = state
        .db
        .orders()
        .get_by_id(&req.order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &req.order_id))?;

    if order.status != OrderStatus::Pending {
        return Err(CoreError::InvalidOrderStatus {
            order_id: req.order_id.clone(),
            current_status: format!("{:?}", order.status).to_lowercase(),
        }
        .into());
    }

    match state
        .db
        .gift_cards()
        .redeem(&card.id, &order.id, req.amount_cents)
        .await?
    {
        GiftCardRedeemOutcome::Redeemed { balance_cents } => {
            info!(code = %code, order_id = %order.id, amount_cents = req.amount_cents, "Gift card redeemed");
            Ok(Json(RedeemGiftCardResponse {
                redeemed: true,
                balance_cents,
            }))
        }
        GiftCardRedeemOutcome::InsufficientFunds => {
            // Balance was depleted between our check and the guarded
            // decrement; report against the current balance
            let current = state
                .db
                .gift_cards()
                .get_by_id(&card.id)
                .await?
                .map(|c| c.balance_cents)
                .unwrap_or(0);
            Err(CoreError::InsufficientBalance {
                requested_cents: req.amount_cents,
                balance_cents: current,
            }
            .into())
        }
    }
}

// =============================================================================
// Balance
// =============================================================================

#[derive(Debug, Serialize)]
pub struct GiftCardBalanceResponse {
    pub code: String,
    pub balance_cents: i64,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `GET /gift-cards/{code}/balance` - balance lookup for the storefront.
pub async fn gift_card_balance(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<GiftCardBalanceResponse>, ApiError> {
    validation::validate_code(&code)?;
    let code = normalize_code(&code);

    let card = state
        .db
        .gift_cards()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::GiftCardNotFound(code.clone())))?;

    Ok(Json(GiftCardBalanceResponse {
        code: card.code,
        balance_cents: card.balance_cents,
        is_active: card.is_active,
        expires_at: card.expires_at,
    }))
}
