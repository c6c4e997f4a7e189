//! # Storefront Client Configuration
//!
//! Where the storefront's shipping and checkout endpoints live.
//! Everything can be overridden from the environment or a `.env` file.

use cart_core::CheckoutError;
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SHIPPING_PATH: &str = "/api/shipping";
pub const DEFAULT_CHECKOUT_PATH: &str = "/api/stripe/checkout";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Storefront HTTP configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Storefront origin (e.g., https://parts.example.com)
    pub base_url: String,

    /// Rate quote endpoint path
    pub shipping_path: String,

    /// Checkout-session endpoint path
    pub checkout_path: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Send an `Idempotency-Key` header with checkout-session requests
    pub idempotency_keys: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `STOREFRONT_BASE_URL`
    /// - `SHIPPING_PATH`
    /// - `CHECKOUT_PATH`
    /// - `HTTP_TIMEOUT_SECS`
    /// - `CHECKOUT_IDEMPOTENCY_KEYS`
    pub fn from_env() -> Result<Self, CheckoutError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut config = Self::default();

        if let Ok(url) = env::var("STOREFRONT_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Ok(path) = env::var("SHIPPING_PATH") {
            config.shipping_path = path;
        }
        if let Ok(path) = env::var("CHECKOUT_PATH") {
            config.checkout_path = path;
        }

        if let Ok(secs) = env::var("HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CheckoutError::Configuration(format!(
                    "HTTP_TIMEOUT_SECS must be a whole number of seconds, got {}",
                    secs
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(flag) = env::var("CHECKOUT_IDEMPOTENCY_KEYS") {
            config.idempotency_keys = matches!(flag.trim(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CheckoutError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CheckoutError::Configuration(
                "STOREFRONT_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(CheckoutError::Configuration(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Full rate quote URL
    pub fn shipping_url(&self) -> String {
        join(&self.base_url, &self.shipping_path)
    }

    /// Full checkout-session URL
    pub fn checkout_url(&self) -> String {
        join(&self.base_url, &self.checkout_path)
    }

    /// Builder: set storefront origin (for testing against a mock server)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_idempotency_keys(mut self, enabled: bool) -> Self {
        self.idempotency_keys = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            shipping_path: DEFAULT_SHIPPING_PATH.to_string(),
            checkout_path: DEFAULT_CHECKOUT_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            idempotency_keys: false,
        }
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
