//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  API errors (in app)                                                   │
//! │  └── ApiError         - What the storefront sees (serialized)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Storefront   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the coupon,
/// gift card, and order flows. They are recovered at the REST boundary
/// and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No coupon exists for the given (normalized) code.
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    /// The coupon exists but an administrator has deactivated it.
    #[error("Coupon {0} is not active")]
    CouponInactive(String),

    /// The coupon's expiry date has passed.
    #[error("Coupon {0} has expired")]
    CouponExpired(String),

    /// Cart value does not meet the coupon's minimum.
    ///
    /// ## User Workflow
    /// ```text
    /// Enter code SAVE10 (min cart $10.00)
    ///      │
    ///      ▼
    /// Cart value: $9.00
    ///      │
    ///      ▼
    /// BelowMinimum { required_cents: 1000, cart_value_cents: 900 }
    ///      │
    ///      ▼
    /// UI shows: "Add $1.00 more to use this coupon"
    /// ```
    #[error("Cart value {cart_value_cents} is below the coupon minimum of {required_cents}")]
    BelowMinimum {
        required_cents: i64,
        cart_value_cents: i64,
    },

    /// The coupon's usage limit has been exhausted.
    #[error("Coupon {0} has reached its usage limit")]
    UsageLimitReached(String),

    /// A coupon that validated during preview failed re-validation at
    /// apply time (expired or exhausted between preview and checkout).
    /// The checkout step must fail, never silently proceed at full price.
    #[error("Coupon {0} is no longer valid")]
    CouponNoLongerValid(String),

    /// The order has already recorded a coupon redemption.
    /// Guarantees at-most-once accounting per order on request retries.
    #[error("Order {0} already has a coupon applied")]
    AlreadyApplied(String),

    /// No gift card exists for the given code.
    #[error("Gift card not found: {0}")]
    GiftCardNotFound(String),

    /// The gift card has been deactivated.
    #[error("Gift card {0} is not active")]
    GiftCardInactive(String),

    /// The gift card's expiry date has passed.
    #[error("Gift card {0} has expired")]
    GiftCardExpired(String),

    /// Redemption amount exceeds the remaining balance.
    #[error("Insufficient balance: requested {requested_cents}, available {balance_cents}")]
    InsufficientBalance {
        requested_cents: i64,
        balance_cents: i64,
    },

    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Confirming payment on an already-paid order
    /// - Shipping an order that was never paid
    /// - Cancelling a shipped order
    #[error("Order {order_id} is {current_status}, cannot perform operation")]
    InvalidOrderStatus {
        order_id: String,
        current_status: String,
    },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad coupon code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::BelowMinimum {
            required_cents: 1000,
            cart_value_cents: 900,
        };
        assert_eq!(
            err.to_string(),
            "Cart value 900 is below the coupon minimum of 1000"
        );

        let err = CoreError::InsufficientBalance {
            requested_cents: 700,
            balance_cents: 500,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance: requested 700, available 500"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::TooLong {
            field: "code".to_string(),
            max: 40,
        };
        assert_eq!(err.to_string(), "code must be at most 40 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
