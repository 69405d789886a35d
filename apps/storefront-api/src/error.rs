//! Error types for the Storefront API.
//!
//! Every error leaving a handler is an [`ApiError`], serialized as
//! `{"code": "...", "message": "..."}` with an appropriate HTTP status.
//! Validation failures are recovered here at the boundary — no partial
//! cart or order mutation survives them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use meridian_core::CoreError;
use meridian_db::DbError;

use crate::providers::ProviderError;

/// Machine-readable error codes for the storefront.
///
/// The storefront switches on these to pick a user-facing message;
/// `message` is the debugging/fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Expired,
    Inactive,
    BelowMinimum,
    LimitReached,
    InsufficientBalance,
    CouponNoLongerValid,
    AlreadyApplied,
    PaymentNotConfirmed,
    Validation,
    Unauthorized,
    Forbidden,
    Conflict,
    ProviderUnavailable,
    Internal,
}

/// API error: code + user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    /// Creates a new ApiError.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a NotFound error.
    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Validation, message)
    }

    /// Shorthand for an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Shorthand for a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::AlreadyApplied | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Expired
            | ErrorCode::Inactive
            | ErrorCode::BelowMinimum
            | ErrorCode::LimitReached
            | ErrorCode::InsufficientBalance
            | ErrorCode::CouponNoLongerValid
            | ErrorCode::PaymentNotConfirmed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ProviderUnavailable => StatusCode::BAD_GATEWAY,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self)).into_response()
    }
}

/// Business rule violations map to their user-facing codes.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::CouponNotFound(_) | CoreError::GiftCardNotFound(_) => ErrorCode::NotFound,
            CoreError::CouponExpired(_) | CoreError::GiftCardExpired(_) => ErrorCode::Expired,
            CoreError::CouponInactive(_) | CoreError::GiftCardInactive(_) => ErrorCode::Inactive,
            CoreError::BelowMinimum { .. } => ErrorCode::BelowMinimum,
            CoreError::UsageLimitReached(_) => ErrorCode::LimitReached,
            CoreError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            CoreError::CouponNoLongerValid(_) => ErrorCode::CouponNoLongerValid,
            CoreError::AlreadyApplied(_) => ErrorCode::AlreadyApplied,
            CoreError::InvalidOrderStatus { .. } => ErrorCode::Conflict,
            CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_) => ErrorCode::Validation,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Input validation failures surface as 400s with the rule text.
impl From<meridian_core::ValidationError> for ApiError {
    fn from(err: meridian_core::ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Storage errors: NotFound keeps its meaning, duplicates become
/// conflicts, everything else is internal (the message is logged at the
/// repository layer; the client gets the generic text).
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            _ => ApiError::new(ErrorCode::Internal, "Internal storage error"),
        }
    }
}

/// Provider failures are retryable 502s; they never collapse into a
/// success state.
impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::new(ErrorCode::ProviderUnavailable, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::not_found("Coupon", "SAVE10").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::validation("bad input").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::new(ErrorCode::ProviderUnavailable, "down").status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::new(ErrorCode::InsufficientBalance, "short").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::CouponNotFound("SAVE10".to_string()).into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: ApiError = CoreError::InsufficientBalance {
            requested_cents: 700,
            balance_cents: 500,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientBalance);

        let err: ApiError = CoreError::CouponNoLongerValid("SAVE10".to_string()).into();
        assert_eq!(err.code, ErrorCode::CouponNoLongerValid);
    }

    #[test]
    fn test_db_error_mapping_hides_internals() {
        let err: ApiError = DbError::QueryFailed("secret table detail".to_string()).into();
        assert_eq!(err.code, ErrorCode::Internal);
        assert!(!err.message.contains("secret"));
    }
}
