//! # Checkout Routes
//!
//! Orchestrates the purchase flow across core pricing, the coupon apply
//! path, and the external providers.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Sequence                                │
//! │                                                                         │
//! │  1. POST /checkout/quote     preview totals, nothing persisted         │
//! │                                                                         │
//! │  2. POST /checkout           order created (Pending) with snapshot     │
//! │                              lines; coupon applied authoritatively;    │
//! │                              a coupon that fails here cancels the      │
//! │                              order and fails the request               │
//! │                                                                         │
//! │  3. POST /orders/{id}/payment  provider order created for the          │
//! │                                persisted total; idempotent on retry    │
//! │                                                                         │
//! │  4. (client-side payment handler runs)                                 │
//! │                                                                         │
//! │  5. POST /checkout/confirm   server fetches provider status; order     │
//! │                              becomes Paid ONLY if the provider says    │
//! │                              captured AND the amount matches the       │
//! │                              persisted total                           │
//! │                                                                         │
//! │  6. POST /orders/{id}/ship   serviceability + shipment creation;       │
//! │                              Shipped only on provider confirmation     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use meridian_core::{
    compute_total, normalize_code, validation, CartLine, CoreError, DiscountResult, Money, Order,
    OrderLine, OrderStatus, RejectionReason, MAX_ORDER_LINES,
};
use meridian_db::{generate_order_line_id, generate_order_number};

use crate::auth::{AdminAuth, SessionAuth};
use crate::error::{ApiError, ErrorCode};
use crate::routes::coupons::apply_coupon_to_order;
use crate::state::AppState;

// =============================================================================
// Shared Validation
// =============================================================================

/// Validates a submitted cart before quoting or checking out.
fn validate_lines(lines: &[CartLine]) -> Result<(), ApiError> {
    if lines.is_empty() {
        return Err(ApiError::validation("Cart is empty"));
    }
    if lines.len() > MAX_ORDER_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_ORDER_LINES,
        }
        .into());
    }
    for line in lines {
        validation::validate_uuid(&line.product_id)?;
        validation::validate_quantity(line.quantity)?;
        validation::validate_price_cents(line.unit_price_cents)?;
    }
    Ok(())
}

// =============================================================================
// Quote (preview only)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub lines: Vec<CartLine>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CouponQuote {
    pub code: String,
    pub valid: bool,
    pub discount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<CouponQuote>,
}

/// `POST /checkout/quote` - computes preview totals. Persists nothing.
///
/// The product page and the cart page both call this, so they present
/// exactly the totals checkout will persist.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    validate_lines(&req.lines)?;

    let base = compute_total(&req.lines, Money::zero());

    let mut coupon_quote = None;
    let mut discount = Money::zero();

    if let Some(raw_code) = &req.coupon_code {
        validation::validate_code(raw_code)?;
        let code = normalize_code(raw_code);

        let result = match state.db.coupons().get_by_code(&code).await? {
            None => DiscountResult::Invalid {
                reason: RejectionReason::NotFound,
            },
            Some(coupon) => {
                coupon.evaluate(Money::from_cents(base.subtotal_cents), Utc::now())
            }
        };

        coupon_quote = Some(match &result {
            DiscountResult::Valid { discount_cents } => CouponQuote {
                code: code.clone(),
                valid: true,
                discount_cents: *discount_cents,
                reason: None,
            },
            DiscountResult::Invalid { reason } => CouponQuote {
                code: code.clone(),
                valid: false,
                discount_cents: 0,
                reason: Some(reason.clone()),
            },
        });
        discount = result.discount();
    }

    let totals = compute_total(&req.lines, discount);

    Ok(Json(QuoteResponse {
        subtotal_cents: totals.subtotal_cents,
        discount_cents: totals.discount_cents,
        total_cents: totals.total_cents,
        currency: totals.currency,
        coupon: coupon_quote,
    }))
}

// =============================================================================
// Checkout (creates the order)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLine>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub order_number: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

/// `POST /checkout` - persists a pending order from the cart.
///
/// The order's totals are computed server-side from the submitted lines;
/// any coupon goes through the same authoritative apply path as
/// `POST /coupons/apply`. If the coupon fails, the freshly created order
/// is cancelled and the whole step fails — there is no silent fallback
/// to full price.
pub async fn checkout(
    SessionAuth(session): SessionAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    validate_lines(&req.lines)?;

    let totals = compute_total(&req.lines, Money::zero());
    let now = Utc::now();
    let order_id = Uuid::new_v4().to_string();
    let order_number = generate_order_number();

    debug!(session = %session.sub, order_id = %order_id, lines = req.lines.len(), "Creating order");

    let order = Order {
        id: order_id.clone(),
        order_number: order_number.clone(),
        status: OrderStatus::Pending,
        subtotal_cents: totals.subtotal_cents,
        discount_cents: 0,
        total_cents: totals.subtotal_cents,
        currency: totals.currency.clone(),
        coupon_code: None,
        payment_reference: None,
        shipment_reference: None,
        created_at: now,
        updated_at: now,
        paid_at: None,
    };

    let lines: Vec<OrderLine> = req
        .lines
        .iter()
        .map(|line| OrderLine {
            id: generate_order_line_id(),
            order_id: order_id.clone(),
            product_id: line.product_id.clone(),
            name_snapshot: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            line_total_cents: line.line_total_cents(),
            created_at: now,
        })
        .collect();

    state.db.orders().insert(&order, &lines).await?;

    let mut discount_cents = 0;
    let mut total_cents = order.total_cents;

    if let Some(raw_code) = &req.coupon_code {
        match apply_coupon_to_order(&state, raw_code, &order_id).await {
            Ok(applied) => {
                discount_cents = applied.discount_cents;
                total_cents = applied.total_cents;
            }
            Err(err) => {
                // Roll back the speculative order rather than proceeding
                // at full price
                warn!(order_id = %order_id, code = %raw_code, "Coupon failed at checkout, cancelling order");
                state.db.orders().cancel(&order_id).await.ok();
                return Err(err);
            }
        }
    }

    info!(order_id = %order_id, order_number = %order_number, total_cents, "Order created");

    Ok(Json(CheckoutResponse {
        order_id,
        order_number,
        subtotal_cents: totals.subtotal_cents,
        discount_cents,
        total_cents,
        currency: totals.currency,
    }))
}

// =============================================================================
// Payment creation
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub provider_order_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

/// `POST /orders/{order_id}/payment` - creates the provider payment order.
///
/// Idempotent: if the order already carries a payment reference, that
/// reference is returned without another provider call, so a retried
/// request (after a provider timeout, say) cannot create two charges.
pub async fn create_payment(
    SessionAuth(_session): SessionAuth,
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let order = state
        .db
        .orders()
        .get_by_id(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))?;

    if order.status != OrderStatus::Pending {
        return Err(CoreError::InvalidOrderStatus {
            order_id: order_id.clone(),
            current_status: format!("{:?}", order.status).to_lowercase(),
        }
        .into());
    }

    if let Some(reference) = &order.payment_reference {
        return Ok(Json(PaymentIntentResponse {
            provider_order_id: reference.clone(),
            amount_cents: order.total_cents,
            currency: order.currency,
        }));
    }

    let provider_order = state
        .payment
        .create_order(order.total_cents, &order.currency, &order.order_number)
        .await?;

    state
        .db
        .orders()
        .set_payment_reference(&order_id, &provider_order.id)
        .await?;

    info!(order_id = %order_id, provider_order_id = %provider_order.id, "Payment order created");

    Ok(Json(PaymentIntentResponse {
        provider_order_id: provider_order.id,
        amount_cents: order.total_cents,
        currency: order.currency,
    }))
}

// =============================================================================
// Confirm
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub order_id: String,
    pub status: String,
}

/// `POST /checkout/confirm` - verifies payment and marks the order paid.
///
/// The client's success callback is a hint, never the proof: the server
/// fetches the provider's view and requires BOTH an explicit captured
/// status AND an amount equal to the persisted total. Anything less
/// leaves the order pending.
pub async fn confirm(
    SessionAuth(_session): SessionAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let order = state
        .db
        .orders()
        .get_by_id(&req.order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &req.order_id))?;

    // Retried confirmation of a paid order is success, not a conflict
    if order.status == OrderStatus::Paid {
        return Ok(Json(ConfirmResponse {
            order_id: order.id,
            status: "paid".to_string(),
        }));
    }

    if order.status != OrderStatus::Pending {
        return Err(CoreError::InvalidOrderStatus {
            order_id: req.order_id.clone(),
            current_status: format!("{:?}", order.status).to_lowercase(),
        }
        .into());
    }

    let reference = order.payment_reference.as_deref().ok_or_else(|| {
        ApiError::validation("Payment was never initiated for this order")
    })?;

    let provider_order = state.payment.fetch_order(reference).await?;

    if !provider_order.is_captured() {
        debug!(order_id = %order.id, provider_status = %provider_order.status, "Payment not captured");
        return Err(ApiError::new(
            ErrorCode::PaymentNotConfirmed,
            format!(
                "Payment provider reports status '{}', not captured",
                provider_order.status
            ),
        ));
    }

    if provider_order.amount != order.total_cents || provider_order.currency != order.currency {
        warn!(
            order_id = %order.id,
            provider_amount = provider_order.amount,
            order_total = order.total_cents,
            "Provider amount does not match persisted total"
        );
        return Err(ApiError::new(
            ErrorCode::PaymentNotConfirmed,
            "Captured amount does not match the order total",
        ));
    }

    state.db.orders().mark_paid(&order.id).await?;
    info!(order_id = %order.id, "Order paid");

    Ok(Json(ConfirmResponse {
        order_id: order.id,
        status: "paid".to_string(),
    }))
}

// =============================================================================
// Ship
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ShipRequest {
    pub delivery_postcode: String,
    pub weight_grams: u32,
}

#[derive(Debug, Serialize)]
pub struct ShipResponse {
    pub order_id: String,
    pub shipment_reference: String,
    pub courier: Option<String>,
    pub estimated_days: Option<u32>,
}

/// `POST /orders/{order_id}/ship` - creates a shipment for a paid order.
///
/// Fulfillment is an admin action. The order becomes Shipped only after
/// the carrier confirmed a shipment id.
pub async fn ship(
    AdminAuth(admin): AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<ShipRequest>,
) -> Result<Json<ShipResponse>, ApiError> {
    let order = state
        .db
        .orders()
        .get_by_id(&order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &order_id))?;

    if order.status != OrderStatus::Paid {
        return Err(CoreError::InvalidOrderStatus {
            order_id: order_id.clone(),
            current_status: format!("{:?}", order.status).to_lowercase(),
        }
        .into());
    }

    let serviceability = state
        .shipment
        .check_serviceability(
            &state.config.pickup_postcode,
            &req.delivery_postcode,
            req.weight_grams,
        )
        .await?;

    if !serviceability.serviceable {
        return Err(ApiError::validation(format!(
            "No courier serves postcode {}",
            req.delivery_postcode
        )));
    }

    let shipment = state
        .shipment
        .create_shipment(
            &order.order_number,
            order.total_cents,
            &state.config.pickup_postcode,
            &req.delivery_postcode,
            req.weight_grams,
        )
        .await?;

    state
        .db
        .orders()
        .mark_shipped(&order_id, &shipment.shipment_id)
        .await?;

    info!(order_id = %order_id, admin = %admin.sub, shipment = %shipment.shipment_id, "Order shipped");

    Ok(Json(ShipResponse {
        order_id,
        shipment_reference: shipment.shipment_id,
        courier: shipment.courier.or(serviceability.courier),
        estimated_days: serviceability.estimated_days,
    }))
}
