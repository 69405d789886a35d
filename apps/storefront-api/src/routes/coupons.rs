//! # Coupon Routes
//!
//! The validate/apply pair at the heart of the storefront:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /coupons/validate    ADVISORY.  Pure read + compute; safe to     │
//! │                            call from the product page on every         │
//! │                            keystroke. Never consumes anything.         │
//! │                                                                         │
//! │  POST /coupons/apply       AUTHORITATIVE. Re-validates against the     │
//! │                            order's persisted subtotal, then consumes   │
//! │                            one use through the guarded conditional     │
//! │                            update. A coupon that died between preview  │
//! │                            and apply fails the request — the order is  │
//! │                            never silently charged full price.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use meridian_core::{
    normalize_code, validation, CoreError, DiscountResult, Money, OrderStatus, RejectionReason,
};
use meridian_db::RedemptionOutcome;

use crate::auth::SessionAuth;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Validate (advisory)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub cart_value_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    pub discount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
}

/// `POST /coupons/validate` - advisory preview.
///
/// Returns 200 with `valid: false` + a reason for ineligible coupons:
/// a rejected preview is a normal answer, not a request failure.
pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateCouponRequest>,
) -> Result<Json<ValidateCouponResponse>, ApiError> {
    validation::validate_code(&req.code)?;
    validation::validate_cart_value_cents(req.cart_value_cents)?;

    let code = normalize_code(&req.code);
    debug!(code = %code, cart_value_cents = req.cart_value_cents, "Validating coupon");

    let result = match state.db.coupons().get_by_code(&code).await? {
        None => DiscountResult::Invalid {
            reason: RejectionReason::NotFound,
        },
        Some(coupon) => coupon.evaluate(Money::from_cents(req.cart_value_cents), Utc::now()),
    };

    let response = match result {
        DiscountResult::Valid { discount_cents } => ValidateCouponResponse {
            valid: true,
            discount_cents,
            reason: None,
        },
        DiscountResult::Invalid { reason } => ValidateCouponResponse {
            valid: false,
            discount_cents: 0,
            reason: Some(reason),
        },
    };

    Ok(Json(response))
}

// =============================================================================
// Apply (authoritative)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct ApplyCouponResponse {
    pub applied: bool,
    pub discount_cents: i64,
    pub total_cents: i64,
}

/// `POST /coupons/apply` - authoritative redemption for an order.
pub async fn apply_coupon(
    SessionAuth(session): SessionAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ApplyCouponRequest>,
) -> Result<Json<ApplyCouponResponse>, ApiError> {
    debug!(session = %session.sub, order_id = %req.order_id, "Apply coupon requested");

    let applied = apply_coupon_to_order(&state, &req.code, &req.order_id).await?;

    Ok(Json(ApplyCouponResponse {
        applied: true,
        discount_cents: applied.discount_cents,
        total_cents: applied.total_cents,
    }))
}

/// Result of applying a coupon to an order.
#[derive(Debug)]
pub(crate) struct AppliedDiscount {
    pub discount_cents: i64,
    pub total_cents: i64,
}

/// The one authoritative apply path, shared by `POST /coupons/apply` and
/// the checkout flow.
///
/// ## Sequence
/// 1. Load the order; it must still be pending.
/// 2. If the order already carries this code, succeed idempotently (a
///    retried request must not double-count). A different code is a
///    conflict.
/// 3. Re-validate the coupon against the order's persisted subtotal —
///    never against what the client claims the cart is worth.
/// 4. Consume one use through the guarded conditional update.
/// 5. Re-point the order's totals at the discounted amounts.
pub(crate) async fn apply_coupon_to_order(
    state: &AppState,
    raw_code: &str,
    order_id: &str,
) -> Result<AppliedDiscount, ApiError> {
    validation::validate_code(raw_code)?;
    let code = normalize_code(raw_code);

    let order = state
        .db
        .orders()
        .get_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))?;

    if order.status != OrderStatus::Pending {
        return Err(CoreError::InvalidOrderStatus {
            order_id: order_id.to_string(),
            current_status: format!("{:?}", order.status).to_lowercase(),
        }
        .into());
    }

    if let Some(existing) = &order.coupon_code {
        if *existing == code {
            // Retried request; the discount is already on the order.
            return Ok(AppliedDiscount {
                discount_cents: order.discount_cents,
                total_cents: order.total_cents,
            });
        }
        return Err(CoreError::AlreadyApplied(order_id.to_string()).into());
    }

    let coupon = state
        .db
        .coupons()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::from(CoreError::CouponNotFound(code.clone())))?;

    // Authoritative re-validation: the preview may be stale
    let discount_cents =
        match coupon.evaluate(Money::from_cents(order.subtotal_cents), Utc::now()) {
            DiscountResult::Valid { discount_cents } => discount_cents,
            DiscountResult::Invalid { reason } => {
                return Err(ApiError::from(reason.into_error(&code)))
            }
        };

    match state
        .db
        .coupons()
        .redeem_for_order(&coupon.id, order_id, discount_cents)
        .await?
    {
        RedemptionOutcome::Applied => {}
        RedemptionOutcome::AlreadyApplied => {
            // Raced another apply for this order holding a different code
            return Err(CoreError::AlreadyApplied(order_id.to_string()).into());
        }
        RedemptionOutcome::NotEligible => {
            // Passed re-validation a moment ago, refused now: a concurrent
            // checkout took the last use or an admin deactivated it
            return Err(CoreError::CouponNoLongerValid(code).into());
        }
    }

    let total_cents = Money::from_cents(order.subtotal_cents)
        .saturating_sub(Money::from_cents(discount_cents))
        .cents();

    state
        .db
        .orders()
        .apply_discount(order_id, &code, discount_cents, total_cents)
        .await?;

    info!(order_id = %order_id, code = %code, discount_cents, "Coupon applied");

    Ok(AppliedDiscount {
        discount_cents,
        total_cents,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtManager;
    use crate::config::ApiConfig;
    use crate::error::ErrorCode;
    use crate::providers::payment::{PaymentClient, PaymentConfig};
    use crate::providers::shipment::{ShipmentClient, ShipmentConfig};
    use chrono::Duration;
    use meridian_core::{Coupon, DiscountRule, Order};
    use meridian_db::{Database, DbConfig};
    use uuid::Uuid;

    /// Full state against an in-memory database. Provider base URLs are
    /// unroutable; none of these tests reach a provider.
    async fn test_state() -> Arc<AppState> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let config = ApiConfig {
            http_port: 0,
            database_path: ":memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_access_lifetime_secs: 3600,
            admin_email: None,
            admin_password: None,
            payment_base_url: "http://localhost:9".to_string(),
            payment_key_id: "key".to_string(),
            payment_key_secret: "secret".to_string(),
            shipment_base_url: "http://localhost:9".to_string(),
            shipment_email: "shop@example.com".to_string(),
            shipment_password: "secret".to_string(),
            pickup_postcode: "000000".to_string(),
            provider_timeout_secs: 1,
        };

        let payment = PaymentClient::new(PaymentConfig {
            base_url: config.payment_base_url.clone(),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
            timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();

        let shipment = ShipmentClient::new(ShipmentConfig {
            base_url: config.shipment_base_url.clone(),
            email: config.shipment_email.clone(),
            password: config.shipment_password.clone(),
            timeout: std::time::Duration::from_secs(1),
        })
        .unwrap();

        Arc::new(AppState {
            db,
            jwt: JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs),
            payment,
            shipment,
            config,
        })
    }

    async fn seed_coupon(state: &AppState, code: &str, usage_limit: i64) -> Coupon {
        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            description: None,
            discount: DiscountRule::Percentage {
                rate_bps: 1000,
                max_discount_cents: 500,
            },
            min_cart_value_cents: 1000,
            expires_at: now + Duration::days(30),
            usage_limit,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.db.coupons().insert(&coupon).await.unwrap();
        coupon
    }

    async fn seed_order(state: &AppState, id: &str, subtotal_cents: i64) {
        let now = Utc::now();
        let order = Order {
            id: id.to_string(),
            order_number: format!("ORD-{}", id),
            status: OrderStatus::Pending,
            subtotal_cents,
            discount_cents: 0,
            total_cents: subtotal_cents,
            currency: "USD".to_string(),
            coupon_code: None,
            payment_reference: None,
            shipment_reference: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        state.db.orders().insert(&order, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_records_discount_on_order() {
        let state = test_state().await;
        seed_coupon(&state, "SAVE10", 100).await;
        seed_order(&state, "o1", 2000).await;

        let applied = apply_coupon_to_order(&state, "save10", "o1").await.unwrap();
        assert_eq!(applied.discount_cents, 200);
        assert_eq!(applied.total_cents, 1800);

        let order = state.db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(order.discount_cents, 200);
        assert_eq!(order.total_cents, 1800);
    }

    #[tokio::test]
    async fn test_retried_apply_counts_once() {
        let state = test_state().await;
        let coupon = seed_coupon(&state, "SAVE10", 100).await;
        seed_order(&state, "o1", 2000).await;

        apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap();
        // Same request again (client retry): succeeds without recounting
        let retried = apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap();
        assert_eq!(retried.discount_cents, 200);

        let loaded = state.db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1);
    }

    #[tokio::test]
    async fn test_second_coupon_on_order_conflicts() {
        let state = test_state().await;
        seed_coupon(&state, "SAVE10", 100).await;
        seed_coupon(&state, "OTHER", 100).await;
        seed_order(&state, "o1", 2000).await;

        apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap();
        let err = apply_coupon_to_order(&state, "OTHER", "o1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyApplied);
    }

    #[tokio::test]
    async fn test_apply_rechecks_eligibility() {
        let state = test_state().await;
        let mut coupon = seed_coupon(&state, "SAVE10", 100).await;
        seed_order(&state, "o1", 2000).await;

        // Coupon expires between preview and apply
        coupon.expires_at = Utc::now() - Duration::hours(1);
        state.db.coupons().update(&coupon).await.unwrap();

        let err = apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Expired);

        // Nothing was consumed or written to the order
        let order = state.db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(order.coupon_code, None);
        assert_eq!(order.total_cents, 2000);
    }

    #[tokio::test]
    async fn test_apply_to_non_pending_order_rejected() {
        let state = test_state().await;
        seed_coupon(&state, "SAVE10", 100).await;
        seed_order(&state, "o1", 2000).await;
        state.db.orders().mark_paid("o1").await.unwrap();

        let err = apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_below_minimum_order_rejected() {
        let state = test_state().await;
        seed_coupon(&state, "SAVE10", 100).await;
        seed_order(&state, "o1", 900).await;

        let err = apply_coupon_to_order(&state, "SAVE10", "o1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BelowMinimum);
    }
}
