//! # Pricing Aggregation
//!
//! Combines line prices, quantities, and an optional discount into the
//! final payable total.
//!
//! ## One Function, Three Call Sites
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Product detail page ──► compute_total() ──► preview (not persisted)   │
//! │                                                                         │
//! │  Cart page ────────────► compute_total() ──► quote (not persisted)     │
//! │                                                                         │
//! │  Checkout ─────────────► compute_total() ──► persisted onto the order  │
//! │                                                                         │
//! │  All three sites run the SAME integer-cent arithmetic. If they ever    │
//! │  disagreed on a total, customer trust is broken — so there is exactly  │
//! │  one implementation to disagree with.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::CartLine;

/// Currency for all storefront prices. Minor units are cents.
pub const CURRENCY: &str = "USD";

// =============================================================================
// Pricing Totals
// =============================================================================

/// The aggregated pricing of a cart or order.
///
/// ## Invariants
/// - `subtotal_cents = Σ unit_price × quantity`
/// - `0 <= discount_cents <= subtotal_cents` (clamped here, independent
///   of any clamping the coupon evaluation already did)
/// - `total_cents = subtotal_cents - discount_cents`, hence never negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Computes the payable total for a set of cart lines and a discount.
///
/// Deterministic and idempotent: identical inputs always yield identical
/// output, so repeated quoting never shifts a total.
///
/// ## Defensive Clamp
/// The discount is clamped to `[0, subtotal]` here even though the coupon
/// evaluation clamps too. `total = max(0, subtotal - discount)` must hold
/// independently of whether upstream discount computation is correct.
///
/// ## Example
/// ```rust
/// use meridian_core::money::Money;
/// use meridian_core::pricing::compute_total;
/// use meridian_core::types::CartLine;
///
/// let lines = vec![CartLine {
///     product_id: "p1".into(),
///     name: "Widget".into(),
///     unit_price_cents: 1000,
///     quantity: 2,
/// }];
///
/// let totals = compute_total(&lines, Money::from_cents(200));
/// assert_eq!(totals.subtotal_cents, 2000);
/// assert_eq!(totals.total_cents, 1800);
/// ```
pub fn compute_total(lines: &[CartLine], discount: Money) -> PricingTotals {
    let subtotal: i64 = lines.iter().map(|line| line.line_total_cents()).sum();

    // Clamp: never negative, never more than the subtotal
    let discount_cents = discount.cents().max(0).min(subtotal.max(0));

    PricingTotals {
        subtotal_cents: subtotal,
        discount_cents,
        total_cents: subtotal - discount_cents,
        currency: CURRENCY.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price_cents: i64, quantity: i64) -> CartLine {
        CartLine {
            product_id: "p1".to_string(),
            name: "Widget".to_string(),
            unit_price_cents,
            quantity,
        }
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let lines = vec![line(1000, 2), line(299, 3)];
        let totals = compute_total(&lines, Money::zero());

        assert_eq!(totals.subtotal_cents, 2897);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 2897);
        assert_eq!(totals.currency, "USD");
    }

    #[test]
    fn test_discount_subtracts() {
        // The SAVE10 scenario: cart 2000, discount 200 → total 1800
        let lines = vec![line(1000, 2)];
        let totals = compute_total(&lines, Money::from_cents(200));

        assert_eq!(totals.subtotal_cents, 2000);
        assert_eq!(totals.discount_cents, 200);
        assert_eq!(totals.total_cents, 1800);
    }

    #[test]
    fn test_total_never_negative() {
        // Buggy upstream discount larger than the cart
        let lines = vec![line(500, 1)];
        let totals = compute_total(&lines, Money::from_cents(700));

        assert_eq!(totals.discount_cents, 500);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_negative_discount_ignored() {
        let lines = vec![line(500, 1)];
        let totals = compute_total(&lines, Money::from_cents(-100));

        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 500);
    }

    #[test]
    fn test_empty_cart() {
        let totals = compute_total(&[], Money::from_cents(300));

        assert_eq!(totals.subtotal_cents, 0);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_idempotent() {
        let lines = vec![line(1000, 2), line(299, 3)];
        let first = compute_total(&lines, Money::from_cents(250));
        let second = compute_total(&lines, Money::from_cents(250));
        assert_eq!(first, second);
    }
}
