//! # Checkout Collaborators
//!
//! Traits for everything the checkout flow talks to but does not own.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌────────────────────────┐
//! │  CartStore   │ ──▶ │    CheckoutFlow    │ ──▶ │  ShippingRateClient    │
//! └──────────────┘     │                    │ ──▶ │  CheckoutSessionClient │
//!                      │                    │ ──▶ │  PaymentClientLoader   │
//!                      │                    │ ──▶ │  Navigator / Notifier  │
//!                      └────────────────────┘     └────────────────────────┘
//! ```
//!
//! HTTP implementations live in `cart-client`; the CLI supplies terminal
//! `Navigator`/`Notifier` implementations.

use crate::cart::CartItem;
use crate::error::CheckoutResult;
use crate::shipping::{ShippingRateRequest, ShippingRatesResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Requests shipping-rate quotes for an address and cart.
#[async_trait]
pub trait ShippingRateClient: Send + Sync {
    /// Send the quote request and parse the options.
    async fn fetch_rates(&self, request: &ShippingRateRequest)
        -> CheckoutResult<ShippingRatesResponse>;
}

/// Item as sent to the checkout-session endpoint.
///
/// Only the provider price reference and quantity travel: the backend is the
/// authority on what is charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItem {
    pub price_id: String,
    pub quantity: u32,
}

/// Body of `POST /api/stripe/checkout`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub items: Vec<CheckoutLineItem>,
}

impl CheckoutSessionRequest {
    pub fn from_items(items: &[CartItem]) -> Self {
        Self {
            items: items
                .iter()
                .map(|item| CheckoutLineItem {
                    price_id: item.stripe_price_id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

/// Response of `POST /api/stripe/checkout`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionResponse {
    /// Hosted checkout page; absent means the session was not created
    #[serde(default)]
    pub url: Option<String>,
}

/// Creates hosted checkout sessions.
#[async_trait]
pub trait CheckoutSessionClient: Send + Sync {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> CheckoutResult<CheckoutSessionResponse>;
}

/// Handle to the initialised payment-provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentClientHandle {
    /// Provider name (e.g., "stripe")
    pub provider: String,
    /// Publishable key the client was initialised with
    pub publishable_key: String,
}

impl PaymentClientHandle {
    pub fn is_live(&self) -> bool {
        self.publishable_key.starts_with("pk_live_")
    }
}

/// Loads the process-wide payment client, initialising it on first use.
#[async_trait]
pub trait PaymentClientLoader: Send + Sync {
    async fn load(&self) -> CheckoutResult<Arc<PaymentClientHandle>>;
}

/// Where the flow sends the shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// In-app route change (e.g., back to `/cart`)
    Route(String),
    /// Full-page redirect off the storefront
    External(String),
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, to: Navigation);
}

/// Blocking user-facing messages.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}
