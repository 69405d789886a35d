//! # Provider Clients
//!
//! Thin wrappers around the external payment and shipment providers.
//!
//! ## Contract With The Rest Of The System
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  • Every call has a bounded wait (connect + request timeouts).         │
//! │  • A timeout or transport failure is ProviderError::Unavailable —      │
//! │    surfaced to the user as a retryable failure, never swallowed        │
//! │    into a success state.                                               │
//! │  • A provider-side rejection passes the provider's status and text    │
//! │    through as ProviderError::Rejected.                                 │
//! │  • An order is only marked paid/shipped after the provider            │
//! │    EXPLICITLY confirmed; "the request didn't error" is not            │
//! │    confirmation.                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod payment;
pub mod shipment;

use thiserror::Error;

/// Errors from provider HTTP calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure: timeout, connection refused, DNS.
    /// Retryable from the client's point of view.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with an error status; its own error text is
    /// passed through.
    #[error("Provider rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider answered 2xx but the body didn't parse.
    #[error("Provider returned an unreadable response: {0}")]
    BadResponse(String),
}

impl ProviderError {
    /// Wraps a reqwest error, distinguishing timeouts from other
    /// transport failures for log readability.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Unavailable("request timed out".to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}
