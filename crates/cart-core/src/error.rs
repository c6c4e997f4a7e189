//! # Checkout Error Types
//!
//! Typed error handling for the parts-cart checkout flow.
//! Fallible checkout operations return `Result<T, CheckoutError>`.

use thiserror::Error;

/// Core error type for checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Configuration errors (missing keys, invalid URLs)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Selected shipping option is not part of the current quote
    #[error("Unknown shipping option: {option_id}")]
    UnknownShippingOption { option_id: String },

    /// Step change not allowed from the current step
    #[error("Invalid checkout transition from {from} to {to}")]
    InvalidStepTransition { from: String, to: String },

    /// Network/HTTP error talking to a storefront endpoint
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Endpoint answered with a non-success status
    #[error("Endpoint error [{endpoint}] HTTP {status}: {message}")]
    EndpointError {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CheckoutError {
    /// Returns true if a user re-click could reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::NetworkError(_) => true,
            CheckoutError::EndpointError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

/// Result type alias for checkout operations
pub type CheckoutResult<T> = Result<T, CheckoutError>;
