//! # Admin Routes
//!
//! Coupon and gift card management for the admin panel. Every handler
//! here requires a token with the admin role.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use meridian_core::{normalize_code, validation, Coupon, DiscountRule, GiftCard};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Rule Validation
// =============================================================================

/// Validates an incoming discount rule definition.
fn validate_rule(rule: &DiscountRule) -> Result<(), ApiError> {
    match *rule {
        DiscountRule::Percentage {
            rate_bps,
            max_discount_cents,
        } => {
            if rate_bps == 0 || rate_bps > 10_000 {
                return Err(ApiError::validation(
                    "rate_bps must be between 1 and 10000 (100%)",
                ));
            }
            if max_discount_cents < 0 {
                return Err(ApiError::validation("max_discount_cents must be non-negative"));
            }
        }
        DiscountRule::FixedAmount { amount_cents } => {
            if amount_cents <= 0 {
                return Err(ApiError::validation("amount_cents must be positive"));
            }
        }
    }
    Ok(())
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    pub description: Option<String>,
    pub discount: DiscountRule,
    pub min_cart_value_cents: i64,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: i64,
}

/// `POST /admin/coupons`
pub async fn create_coupon(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    validation::validate_code(&req.code)?;
    validate_rule(&req.discount)?;
    if req.min_cart_value_cents < 0 {
        return Err(ApiError::validation("min_cart_value_cents must be non-negative"));
    }
    if req.usage_limit < 0 {
        return Err(ApiError::validation("usage_limit must be non-negative"));
    }

    let now = Utc::now();
    let coupon = Coupon {
        id: Uuid::new_v4().to_string(),
        code: normalize_code(&req.code),
        description: req.description,
        discount: req.discount,
        min_cart_value_cents: req.min_cart_value_cents,
        expires_at: req.expires_at,
        usage_limit: req.usage_limit,
        usage_count: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.coupons().insert(&coupon).await?;
    info!(admin = %admin.sub, code = %coupon.code, "Coupon created");

    Ok(Json(coupon))
}

/// `GET /admin/coupons`
pub async fn list_coupons(
    AdminAuth(_admin): AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    Ok(Json(state.db.coupons().list().await?))
}

/// `GET /admin/coupons/{id}`
pub async fn get_coupon(
    AdminAuth(_admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Coupon>, ApiError> {
    let coupon = state
        .db
        .coupons()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon", &id))?;

    Ok(Json(coupon))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCouponRequest {
    pub description: Option<String>,
    pub discount: Option<DiscountRule>,
    pub min_cart_value_cents: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<i64>,
    pub is_active: Option<bool>,
}

/// `PUT /admin/coupons/{id}` - partial update.
///
/// The code and the usage counter are immutable: the code because orders
/// reference it, the counter because only redemption may move it.
pub async fn update_coupon(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>, ApiError> {
    let mut coupon = state
        .db
        .coupons()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon", &id))?;

    if let Some(discount) = req.discount {
        validate_rule(&discount)?;
        coupon.discount = discount;
    }
    if let Some(description) = req.description {
        coupon.description = Some(description);
    }
    if let Some(min) = req.min_cart_value_cents {
        if min < 0 {
            return Err(ApiError::validation("min_cart_value_cents must be non-negative"));
        }
        coupon.min_cart_value_cents = min;
    }
    if let Some(expires_at) = req.expires_at {
        coupon.expires_at = expires_at;
    }
    if let Some(limit) = req.usage_limit {
        if limit < 0 {
            return Err(ApiError::validation("usage_limit must be non-negative"));
        }
        coupon.usage_limit = limit;
    }
    if let Some(active) = req.is_active {
        coupon.is_active = active;
    }

    state.db.coupons().update(&coupon).await?;
    info!(admin = %admin.sub, code = %coupon.code, "Coupon updated");

    // Re-read for the authoritative usage counter
    let fresh = state
        .db
        .coupons()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon", &id))?;

    Ok(Json(fresh))
}

#[derive(Debug, Serialize)]
pub struct DeleteCouponResponse {
    /// True when the row was physically removed.
    pub deleted: bool,
    /// True when redemption history forced a soft-deactivate instead.
    pub deactivated: bool,
}

/// `DELETE /admin/coupons/{id}`
///
/// Coupons referenced by orders are soft-deactivated, never deleted.
pub async fn delete_coupon(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteCouponResponse>, ApiError> {
    let deleted = state.db.coupons().remove(&id).await?;
    info!(admin = %admin.sub, id = %id, deleted, "Coupon removed");

    Ok(Json(DeleteCouponResponse {
        deleted,
        deactivated: !deleted,
    }))
}

// =============================================================================
// Gift Cards
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateGiftCardRequest {
    pub code: String,
    pub amount_cents: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `POST /admin/gift-cards`
pub async fn create_gift_card(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGiftCardRequest>,
) -> Result<Json<GiftCard>, ApiError> {
    validation::validate_code(&req.code)?;
    validation::validate_amount_cents(req.amount_cents)?;

    let now = Utc::now();
    let card = GiftCard {
        id: Uuid::new_v4().to_string(),
        code: normalize_code(&req.code),
        initial_amount_cents: req.amount_cents,
        balance_cents: req.amount_cents,
        expires_at: req.expires_at,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.gift_cards().insert(&card).await?;
    info!(admin = %admin.sub, code = %card.code, amount_cents = req.amount_cents, "Gift card created");

    Ok(Json(card))
}

/// `GET /admin/gift-cards`
pub async fn list_gift_cards(
    AdminAuth(_admin): AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GiftCard>>, ApiError> {
    Ok(Json(state.db.gift_cards().list().await?))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// `PUT /admin/gift-cards/{id}/active`
///
/// Gift cards are never deleted — a card with a remaining balance is a
/// liability the books must keep seeing. Deactivation is the only off
/// switch.
pub async fn set_gift_card_active(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetActiveRequest>,
) -> Result<Json<GiftCard>, ApiError> {
    state.db.gift_cards().set_active(&id, req.is_active).await?;

    let card = state
        .db
        .gift_cards()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Gift card", &id))?;

    info!(admin = %admin.sub, code = %card.code, is_active = req.is_active, "Gift card toggled");

    Ok(Json(card))
}
