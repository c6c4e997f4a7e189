//! # cart-core
//!
//! Checkout orchestration for the parts storefront.
//!
//! This crate provides:
//! - `CartItem` and the `CartStore` trait with an in-memory store
//! - `ShippingAddress`, `ShippingOption` and rate quote types
//! - `OrderSummary` for subtotal/shipping/total math
//! - `CheckoutFlow`, the cart → shipping → hosted checkout state machine
//! - Collaborator traits (`ShippingRateClient`, `CheckoutSessionClient`, ...)
//! - `CheckoutError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_core::{CheckoutFlow, CheckoutServices, ShippingAddress, PayOutcome};
//!
//! let flow = Arc::new(CheckoutFlow::new(services));
//! flow.mount();
//! let _guard = flow.watch_cart();
//!
//! flow.continue_to_shipping()?;
//! flow.set_address(ShippingAddress::new("Ada", "1 Main St", "Austin", "TX", "73301"));
//! flow.calculate_shipping().await;
//!
//! if let PayOutcome::Redirected(url) = flow.pay().await? {
//!     // browser is on its way to `url`
//! }
//! ```

pub mod address;
pub mod cart;
pub mod error;
pub mod flow;
pub mod money;
pub mod ports;
pub mod shipping;
pub mod totals;
pub mod view;

// Re-exports for convenience
pub use address::{ShippingAddress, DEFAULT_COUNTRY};
pub use cart::{CartFile, CartItem, CartStore, InMemoryCartStore};
pub use error::{CheckoutError, CheckoutResult};
pub use flow::{
    CartClearPolicy, CheckoutFlow, CheckoutServices, CheckoutStep, FlowConfig, PayOutcome,
    ShippingOutcome, DEFAULT_CART_PATH, SESSION_FAILED_MESSAGE,
};
pub use money::{Currency, Price};
pub use ports::{
    CheckoutLineItem, CheckoutSessionClient, CheckoutSessionRequest, CheckoutSessionResponse,
    Navigation, Navigator, Notifier, PaymentClientHandle, PaymentClientLoader, ShippingRateClient,
};
pub use shipping::{
    ShippingItem, ShippingOption, ShippingQuote, ShippingRateRequest, ShippingRatesResponse,
};
pub use totals::OrderSummary;
pub use view::{CartView, CheckoutView, LineView, PayButton, ShippingOptionView, ShippingView};
