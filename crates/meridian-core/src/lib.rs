//! # meridian-core: Pure Business Logic for Meridian Commerce
//!
//! This crate is the **heart** of the storefront backend. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Meridian Commerce Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Storefront / Admin Panel (web)                 │   │
//! │  │    Product page ──► Cart ──► Checkout ──► Order tracking       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/storefront-api (axum)                      │   │
//! │  │    /coupons/validate, /coupons/apply, /checkout, /admin/...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  coupon   │  │  pricing  │  │   │
//! │  │   │  Coupon   │  │   Money   │  │ evaluate  │  │  totals   │  │   │
//! │  │   │ GiftCard  │  │  (cents)  │  │  (pure)   │  │  (pure)   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  meridian-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, conditional updates          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Coupon, GiftCard, Order, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`coupon`] - Coupon eligibility and discount computation
//! - [`pricing`] - Cart/order total aggregation
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Validate ≠ Apply**: evaluation never mutates; consuming a coupon or
//!    gift card balance is the database layer's job, behind a conditional
//!    update
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//! use meridian_core::pricing::compute_total;
//! use meridian_core::types::CartLine;
//!
//! let lines = vec![CartLine {
//!     product_id: "p1".into(),
//!     name: "Widget".into(),
//!     unit_price_cents: 1000,
//!     quantity: 2,
//! }];
//!
//! // Cart of $20.00 with a $2.00 discount
//! let totals = compute_total(&lines, Money::from_cents(200));
//! assert_eq!(totals.total_cents, 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use meridian_core::Money` instead of
// `use meridian_core::money::Money`

pub use coupon::{normalize_code, DiscountResult, RejectionReason};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use pricing::{compute_total, PricingTotals, CURRENCY};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart or order
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable order sizes.
/// Can be made configurable per-store in future versions.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
