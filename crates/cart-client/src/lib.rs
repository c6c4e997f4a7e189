//! # cart-client
//!
//! HTTP and payment-provider implementations of the `cart-core`
//! collaborator traits.
//!
//! - **HttpShippingRateClient** - `POST /api/shipping` rate quotes
//! - **HttpCheckoutSessionClient** - `POST /api/stripe/checkout` sessions
//! - **StripeClientLoader** - process-wide Stripe client, loaded on first use
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cart_client::{ClientConfig, HttpCheckoutSessionClient, HttpShippingRateClient};
//!
//! let config = ClientConfig::from_env()?;
//! let rates = HttpShippingRateClient::new(&config)?;
//! let sessions = HttpCheckoutSessionClient::new(&config)?;
//! ```

pub mod checkout;
pub mod config;
pub mod shipping;
pub mod stripe;

// Re-exports
pub use checkout::HttpCheckoutSessionClient;
pub use config::ClientConfig;
pub use shipping::HttpShippingRateClient;
pub use stripe::{validate_publishable_key, StripeClientLoader};

use cart_core::{CheckoutError, CheckoutResult};

/// Shared reqwest client settings
pub(crate) fn http_client(config: &ClientConfig) -> CheckoutResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| CheckoutError::Configuration(format!("Failed to create HTTP client: {}", e)))
}
