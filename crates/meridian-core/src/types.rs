//! # Domain Types
//!
//! Core domain types used throughout Meridian Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │    GiftCard     │   │      Order      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  code (business)│   │  code (business)│   │  order_number   │       │
//! │  │  discount rule  │   │  balance_cents  │   │  status         │       │
//! │  │  usage counters │   │  expires_at     │   │  total_cents    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRule   │   │   OrderStatus   │   │    CartLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Percentage     │   │  Pending        │   │  product_id     │       │
//! │  │  FixedAmount    │   │  Paid           │   │  unit_price     │       │
//! │  └─────────────────┘   │  Shipped        │   │  quantity       │       │
//! │                        │  Cancelled      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (coupon code, gift card code, order_number) -
//!   human-readable, what customers and administrators actually type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Discount Rule
// =============================================================================

/// How a coupon computes its discount.
///
/// ## Why a Tagged Enum?
/// The rule crosses the storefront/backend boundary as JSON. A tagged enum
/// forces every consumer to handle both shapes exhaustively instead of
/// sniffing optional fields on an untyped payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountRule {
    /// A percentage of the cart value, capped at `max_discount_cents`.
    ///
    /// `rate_bps` is in basis points: 1000 = 10%.
    Percentage {
        rate_bps: u32,
        max_discount_cents: i64,
    },
    /// A flat amount off the cart.
    FixedAmount { amount_cents: i64 },
}

impl DiscountRule {
    /// Computes the discount this rule grants against a cart value.
    ///
    /// ## Clamping Invariants
    /// - Percentage: `min(cart × rate, max_discount)`, then clamped to the
    ///   cart value.
    /// - Fixed: `min(amount, cart_value)`.
    ///
    /// The clamp to cart value is a correctness invariant in both arms:
    /// a discount must never exceed what is being discounted.
    ///
    /// ## Example
    /// ```rust
    /// use meridian_core::money::Money;
    /// use meridian_core::types::DiscountRule;
    ///
    /// let rule = DiscountRule::Percentage { rate_bps: 1000, max_discount_cents: 500 };
    /// // 10% of $20.00 is $2.00, under the $5.00 cap
    /// assert_eq!(rule.discount_for(Money::from_cents(2000)).cents(), 200);
    /// ```
    pub fn discount_for(&self, cart_value: Money) -> Money {
        match *self {
            DiscountRule::Percentage {
                rate_bps,
                max_discount_cents,
            } => cart_value
                .percentage_bps(rate_bps)
                .min(Money::from_cents(max_discount_cents))
                .min(cart_value),
            DiscountRule::FixedAmount { amount_cents } => {
                Money::from_cents(amount_cents).min(cart_value)
            }
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A persisted coupon definition.
///
/// Created and edited by administrators, read by the validator on every
/// redemption attempt. The usage counter is mutated only by the apply
/// path, through a conditional update in the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Coupon code, stored case-normalized (trimmed, uppercased).
    pub code: String,

    /// Optional admin-facing description.
    pub description: Option<String>,

    /// How the discount is computed.
    pub discount: DiscountRule,

    /// Minimum cart value required to redeem, in cents.
    pub min_cart_value_cents: i64,

    /// When the coupon stops being redeemable.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,

    /// Maximum number of redemptions across all orders.
    pub usage_limit: i64,

    /// Redemptions recorded so far.
    pub usage_count: i64,

    /// Whether the coupon is active (soft delete).
    /// Coupons referenced by orders are deactivated, never deleted.
    pub is_active: bool,

    /// When the coupon was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the coupon was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Remaining redemptions before the usage limit is hit.
    #[inline]
    pub fn remaining_uses(&self) -> i64 {
        (self.usage_limit - self.usage_count).max(0)
    }
}

// =============================================================================
// Gift Card
// =============================================================================

/// A stored-value instrument with a depletable balance.
///
/// ## Invariant
/// `0 <= balance_cents <= initial_amount_cents`. The balance only
/// decreases, and only through redemption — the database layer enforces
/// this with a conditional decrement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GiftCard {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Gift card code, stored case-normalized.
    pub code: String,

    /// Value the card was issued with, in cents.
    pub initial_amount_cents: i64,

    /// Remaining balance, in cents.
    pub balance_cents: i64,

    /// Optional expiry; cards without one never expire.
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Whether the card is active (soft delete).
    pub is_active: bool,

    /// When the card was issued.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the card was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl GiftCard {
    /// Returns the remaining balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Whether the card has passed its expiry date.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now > expiry)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## Transitions
/// ```text
/// Pending ──(provider confirmed payment)──► Paid ──(shipment created)──► Shipped
///    │
///    └──(cancelled before payment)──► Cancelled
/// ```
/// An order is never marked Paid or Shipped without explicit provider
/// confirmation; provider failure leaves it Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, payment not yet confirmed.
    Pending,
    /// Payment provider confirmed the charge.
    Paid,
    /// Shipment provider confirmed a shipment.
    Shipped,
    /// Order was cancelled before payment.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order with persisted totals.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    /// Coupon applied to this order, if any (normalized code).
    pub coupon_code: Option<String>,
    /// Order identifier at the payment provider.
    pub payment_reference: Option<String>,
    /// Shipment identifier at the shipment provider.
    pub shipment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns the payable total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Cart Line / Order Line
// =============================================================================

/// A line in a cart, as submitted by the storefront.
///
/// ## Snapshot Pattern
/// Product name and unit price are captured at the time the line enters
/// the cart. If the catalog changes afterwards, the cart (and any order
/// created from it) keeps the price the customer saw.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Unit price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Quantity ordered.
    pub quantity: i64,
}

impl CartLine {
    /// Calculates the line total (unit price × quantity).
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// A persisted line item on an order.
/// Uses the snapshot pattern to freeze cart data at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at checkout time (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at checkout time (frozen).
    pub unit_price_cents: i64,
    /// Quantity ordered.
    pub quantity: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Admin User
// =============================================================================

/// An administrator account for the admin panel.
///
/// The password hash is argon2; hashing and verification happen in the
/// API layer. This type never crosses the storefront boundary — note the
/// absence of a TS export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    /// argon2 PHC-format hash, never the plaintext.
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_rule_percentage_under_cap() {
        let rule = DiscountRule::Percentage {
            rate_bps: 1000,
            max_discount_cents: 500,
        };
        // 10% of $20.00 = $2.00, under the $5.00 cap
        assert_eq!(rule.discount_for(Money::from_cents(2000)).cents(), 200);
    }

    #[test]
    fn test_discount_rule_percentage_hits_cap() {
        let rule = DiscountRule::Percentage {
            rate_bps: 1000,
            max_discount_cents: 500,
        };
        // 10% of $100.00 = $10.00, capped at $5.00
        assert_eq!(rule.discount_for(Money::from_cents(10_000)).cents(), 500);
    }

    #[test]
    fn test_discount_rule_fixed_clamps_to_cart() {
        let rule = DiscountRule::FixedAmount { amount_cents: 2000 };
        // $20 off a $15 cart discounts $15
        assert_eq!(rule.discount_for(Money::from_cents(1500)).cents(), 1500);
        // $20 off a $50 cart discounts the full $20
        assert_eq!(rule.discount_for(Money::from_cents(5000)).cents(), 2000);
    }

    #[test]
    fn test_gift_card_expiry() {
        let now = Utc::now();
        let card = GiftCard {
            id: "g1".to_string(),
            code: "GIFT-1".to_string(),
            initial_amount_cents: 500,
            balance_cents: 500,
            expires_at: Some(now - chrono::Duration::days(1)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(card.is_expired(now));

        let evergreen = GiftCard {
            expires_at: None,
            ..card
        };
        assert!(!evergreen.is_expired(now));
    }

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_cart_line_total() {
        let line = CartLine {
            product_id: "p1".to_string(),
            name: "Widget".to_string(),
            unit_price_cents: 299,
            quantity: 3,
        };
        assert_eq!(line.line_total_cents(), 897);
    }
}
