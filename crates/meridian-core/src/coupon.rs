//! # Coupon Evaluation
//!
//! Pure eligibility checks and discount computation for coupons.
//!
//! ## Preview vs. Apply
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Two Distinct Operations, One Rule Set                   │
//! │                                                                         │
//! │  PREVIEW (advisory)                 APPLY (authoritative)              │
//! │  ──────────────────                 ─────────────────────              │
//! │  Product page / cart                Checkout                           │
//! │       │                                  │                             │
//! │       ▼                                  ▼                             │
//! │  Coupon::evaluate() ◄────────────── Coupon::evaluate() (re-check)     │
//! │       │                                  │                             │
//! │       ▼                                  ▼                             │
//! │  DiscountResult                     conditional usage increment        │
//! │  (nothing persisted)                (database layer, atomic)           │
//! │                                                                         │
//! │  The SAME evaluate() runs in both paths. Apply re-validates because    │
//! │  the coupon may have expired or been exhausted between the customer    │
//! │  seeing the preview and pressing "Pay".                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module never mutates anything — consuming a coupon lives in the
//! database layer, behind a conditional update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;
use crate::types::Coupon;

// =============================================================================
// Code Normalization
// =============================================================================

/// Normalizes a coupon or gift card code for lookup and storage.
///
/// Codes are compared case-insensitively: `save10`, `Save10`, and `SAVE10`
/// all name the same coupon. Storage and lookup both use this form.
///
/// ## Example
/// ```rust
/// use meridian_core::coupon::normalize_code;
///
/// assert_eq!(normalize_code("  save10 "), "SAVE10");
/// ```
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// =============================================================================
// Discount Result
// =============================================================================

/// Why a coupon was rejected.
///
/// Exhaustive by design: callers match on every variant, so no rejection
/// can silently fall through to "no discount, no message".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// No coupon exists for the code.
    NotFound,
    /// An administrator deactivated the coupon.
    Inactive,
    /// The expiry date has passed.
    Expired,
    /// Cart value is below the coupon's minimum.
    BelowMinimum {
        required_cents: i64,
        cart_value_cents: i64,
    },
    /// All redemptions have been used.
    LimitReached,
}

impl RejectionReason {
    /// Converts a rejection into the corresponding domain error,
    /// carrying the coupon code for context.
    pub fn into_error(self, code: &str) -> CoreError {
        match self {
            RejectionReason::NotFound => CoreError::CouponNotFound(code.to_string()),
            RejectionReason::Inactive => CoreError::CouponInactive(code.to_string()),
            RejectionReason::Expired => CoreError::CouponExpired(code.to_string()),
            RejectionReason::BelowMinimum {
                required_cents,
                cart_value_cents,
            } => CoreError::BelowMinimum {
                required_cents,
                cart_value_cents,
            },
            RejectionReason::LimitReached => CoreError::UsageLimitReached(code.to_string()),
        }
    }
}

/// The outcome of validating a coupon against a cart value.
///
/// Transient value object: produced fresh per validation call, never
/// persisted, owned by the calling request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DiscountResult {
    /// The coupon is redeemable; `discount_cents` is the computed amount.
    Valid { discount_cents: i64 },
    /// The coupon is not redeemable for the stated reason.
    Invalid { reason: RejectionReason },
}

impl DiscountResult {
    /// Whether the coupon validated successfully.
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, DiscountResult::Valid { .. })
    }

    /// The discount as Money; zero for invalid results.
    pub fn discount(&self) -> Money {
        match self {
            DiscountResult::Valid { discount_cents } => Money::from_cents(*discount_cents),
            DiscountResult::Invalid { .. } => Money::zero(),
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

impl Coupon {
    /// Evaluates this coupon against a cart value.
    ///
    /// Pure read + compute: no side effects, safe to call from the
    /// product-page preview without consuming the coupon.
    ///
    /// ## Check Order
    /// Expired → Inactive → BelowMinimum → LimitReached. (`NotFound` is
    /// produced by the lookup layer — a loaded coupon obviously exists.)
    ///
    /// ## Discount Computation
    /// Delegates to [`crate::types::DiscountRule::discount_for`], which clamps
    /// percentage discounts at `max_discount` and both kinds at the cart
    /// value.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::{Duration, Utc};
    /// use meridian_core::coupon::DiscountResult;
    /// use meridian_core::money::Money;
    /// use meridian_core::types::{Coupon, DiscountRule};
    ///
    /// let now = Utc::now();
    /// let coupon = Coupon {
    ///     id: "c1".into(),
    ///     code: "SAVE10".into(),
    ///     description: None,
    ///     discount: DiscountRule::Percentage { rate_bps: 1000, max_discount_cents: 500 },
    ///     min_cart_value_cents: 1000,
    ///     expires_at: now + Duration::days(30),
    ///     usage_limit: 100,
    ///     usage_count: 0,
    ///     is_active: true,
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    ///
    /// let result = coupon.evaluate(Money::from_cents(2000), now);
    /// assert_eq!(result, DiscountResult::Valid { discount_cents: 200 });
    /// ```
    pub fn evaluate(&self, cart_value: Money, now: DateTime<Utc>) -> DiscountResult {
        if now > self.expires_at {
            return DiscountResult::Invalid {
                reason: RejectionReason::Expired,
            };
        }

        if !self.is_active {
            return DiscountResult::Invalid {
                reason: RejectionReason::Inactive,
            };
        }

        if cart_value.cents() < self.min_cart_value_cents {
            return DiscountResult::Invalid {
                reason: RejectionReason::BelowMinimum {
                    required_cents: self.min_cart_value_cents,
                    cart_value_cents: cart_value.cents(),
                },
            };
        }

        if self.usage_count >= self.usage_limit {
            return DiscountResult::Invalid {
                reason: RejectionReason::LimitReached,
            };
        }

        DiscountResult::Valid {
            discount_cents: self.discount.discount_for(cart_value).cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscountRule;
    use chrono::Duration;

    fn save10(now: DateTime<Utc>) -> Coupon {
        Coupon {
            id: "c1".to_string(),
            code: "SAVE10".to_string(),
            description: None,
            discount: DiscountRule::Percentage {
                rate_bps: 1000,
                max_discount_cents: 500,
            },
            min_cart_value_cents: 1000,
            expires_at: now + Duration::days(30),
            usage_limit: 100,
            usage_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("save10"), "SAVE10");
        assert_eq!(normalize_code("  Save10  "), "SAVE10");
        assert_eq!(normalize_code("SAVE10"), "SAVE10");
    }

    #[test]
    fn test_save10_on_qualifying_cart() {
        // SAVE10: 10%, max discount 500, min cart 1000.
        // Cart 2000 → discount 200.
        let now = Utc::now();
        let result = save10(now).evaluate(Money::from_cents(2000), now);
        assert_eq!(result, DiscountResult::Valid { discount_cents: 200 });
    }

    #[test]
    fn test_save10_below_minimum() {
        // Cart 900 < min 1000 → BelowMinimum, discount 0.
        let now = Utc::now();
        let result = save10(now).evaluate(Money::from_cents(900), now);
        assert_eq!(
            result,
            DiscountResult::Invalid {
                reason: RejectionReason::BelowMinimum {
                    required_cents: 1000,
                    cart_value_cents: 900,
                },
            }
        );
        assert_eq!(result.discount().cents(), 0);
    }

    #[test]
    fn test_percentage_discount_capped() {
        // 10% of 100_000 is 10_000, capped at 500.
        let now = Utc::now();
        let result = save10(now).evaluate(Money::from_cents(100_000), now);
        assert_eq!(result, DiscountResult::Valid { discount_cents: 500 });
    }

    #[test]
    fn test_percentage_discount_never_exceeds_cart() {
        let now = Utc::now();
        let mut coupon = save10(now);
        // Pathological rule: 200% with an enormous cap
        coupon.discount = DiscountRule::Percentage {
            rate_bps: 20_000,
            max_discount_cents: i64::MAX,
        };
        coupon.min_cart_value_cents = 0;
        let result = coupon.evaluate(Money::from_cents(2000), now);
        assert_eq!(result, DiscountResult::Valid { discount_cents: 2000 });
    }

    #[test]
    fn test_fixed_discount_clamped_to_cart() {
        let now = Utc::now();
        let mut coupon = save10(now);
        coupon.discount = DiscountRule::FixedAmount { amount_cents: 2000 };
        coupon.min_cart_value_cents = 0;

        let result = coupon.evaluate(Money::from_cents(1500), now);
        assert_eq!(result, DiscountResult::Valid { discount_cents: 1500 });
    }

    #[test]
    fn test_expired_coupon() {
        let now = Utc::now();
        let mut coupon = save10(now);
        coupon.expires_at = now - Duration::hours(1);

        let result = coupon.evaluate(Money::from_cents(2000), now);
        assert_eq!(
            result,
            DiscountResult::Invalid {
                reason: RejectionReason::Expired,
            }
        );
    }

    #[test]
    fn test_inactive_coupon() {
        let now = Utc::now();
        let mut coupon = save10(now);
        coupon.is_active = false;

        let result = coupon.evaluate(Money::from_cents(2000), now);
        assert_eq!(
            result,
            DiscountResult::Invalid {
                reason: RejectionReason::Inactive,
            }
        );
    }

    #[test]
    fn test_usage_limit_reached() {
        let now = Utc::now();
        let mut coupon = save10(now);
        coupon.usage_limit = 1;
        coupon.usage_count = 1;

        let result = coupon.evaluate(Money::from_cents(2000), now);
        assert_eq!(
            result,
            DiscountResult::Invalid {
                reason: RejectionReason::LimitReached,
            }
        );
    }

    #[test]
    fn test_evaluate_is_pure() {
        // Evaluating twice yields the same result and leaves the coupon
        // untouched — preview must never consume.
        let now = Utc::now();
        let coupon = save10(now);
        let before = coupon.usage_count;

        let first = coupon.evaluate(Money::from_cents(2000), now);
        let second = coupon.evaluate(Money::from_cents(2000), now);

        assert_eq!(first, second);
        assert_eq!(coupon.usage_count, before);
    }

    #[test]
    fn test_rejection_into_error() {
        let err = RejectionReason::LimitReached.into_error("SAVE10");
        assert!(matches!(err, CoreError::UsageLimitReached(code) if code == "SAVE10"));
    }
}
