//! # Route Layer
//!
//! REST surface for the storefront and admin panel.
//!
//! ## Surface Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront (public / session)                                         │
//! │    POST /auth/session             issue a customer session token       │
//! │    POST /coupons/validate         advisory preview (no mutation)       │
//! │    POST /coupons/apply            authoritative redemption [session]   │
//! │    POST /gift-cards/redeem        balance decrement        [session]   │
//! │    GET  /gift-cards/{code}/balance                                     │
//! │    POST /checkout/quote           preview totals (no persistence)      │
//! │    POST /checkout                 create pending order     [session]   │
//! │    POST /orders/{id}/payment      create provider order    [session]   │
//! │    POST /checkout/confirm         verify + mark paid       [session]   │
//! │    GET  /orders/{id}              order tracking                       │
//! │                                                                         │
//! │  Admin (JWT, admin role)                                               │
//! │    POST /admin/login                                                   │
//! │    GET|POST /admin/coupons        PUT|DELETE /admin/coupons/{id}       │
//! │    GET|POST /admin/gift-cards     PUT /admin/gift-cards/{id}/active    │
//! │    POST /orders/{id}/ship         serviceability + shipment [admin]    │
//! │                                                                         │
//! │  GET /health                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod admin;
pub mod auth;
pub mod checkout;
pub mod coupons;
pub mod gift_cards;
pub mod orders;

use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        // Sessions
        .route("/auth/session", post(auth::create_session))
        .route("/admin/login", post(auth::admin_login))
        // Coupons
        .route("/coupons/validate", post(coupons::validate_coupon))
        .route("/coupons/apply", post(coupons::apply_coupon))
        // Gift cards
        .route("/gift-cards/redeem", post(gift_cards::redeem_gift_card))
        .route("/gift-cards/{code}/balance", get(gift_cards::gift_card_balance))
        // Checkout
        .route("/checkout/quote", post(checkout::quote))
        .route("/checkout", post(checkout::checkout))
        .route("/checkout/confirm", post(checkout::confirm))
        .route("/orders/{order_id}/payment", post(checkout::create_payment))
        .route("/orders/{order_id}/ship", post(checkout::ship))
        // Order tracking
        .route("/orders/{order_id}", get(orders::get_order))
        // Admin: coupons
        .route(
            "/admin/coupons",
            get(admin::list_coupons).post(admin::create_coupon),
        )
        .route(
            "/admin/coupons/{id}",
            get(admin::get_coupon)
                .put(admin::update_coupon)
                .delete(admin::delete_coupon),
        )
        // Admin: gift cards
        .route(
            "/admin/gift-cards",
            get(admin::list_gift_cards).post(admin::create_gift_card),
        )
        .route(
            "/admin/gift-cards/{id}/active",
            put(admin::set_gift_card_active),
        )
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}
