//! # cart-wasm
//!
//! WebAssembly bindings for the parts checkout.
//!
//! The browser keeps its own cart and form state; these functions give it
//! the same totals, address gating and pay-button rules as the native flow.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { calculate_total, format_price, pay_button_state } from 'cart-wasm';
//!
//! await init();
//!
//! const cents = calculate_total(cart.items, shippingOptions, selectedShipping);
//! console.log('Total:', format_price(cents));
//!
//! const button = pay_button_state(shippingOptions.length, loading, selectedShipping);
//! // null when there is nothing to pay for yet
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use cart_core::totals::{self, OrderSummary};
use cart_core::{CartItem, Currency, PayButton, Price, ShippingAddress, ShippingOption};
use wasm_bindgen::prelude::*;

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Cart subtotal in cents
#[wasm_bindgen]
pub fn calculate_subtotal(items: JsValue) -> Result<i64, JsValue> {
    let items: Vec<CartItem> = from_js(items, "cart items")?;
    Ok(totals::subtotal(&items, Currency::USD).amount)
}

/// Subtotal plus the selected option's cost, in cents
#[wasm_bindgen]
pub fn calculate_total(items: JsValue, options: JsValue, selected: &str) -> Result<i64, JsValue> {
    let items: Vec<CartItem> = from_js(items, "cart items")?;
    let options: Vec<ShippingOption> = from_js(options, "shipping options")?;
    Ok(total_cents(&items, &options, selected))
}

fn total_cents(items: &[CartItem], options: &[ShippingOption], selected: &str) -> i64 {
    OrderSummary::compute(items, options, selected, Currency::USD)
        .total
        .amount
}

/// Format a price in cents to display string
#[wasm_bindgen]
pub fn format_price(cents: i64) -> String {
    Price::from_cents(cents, Currency::USD).display()
}

/// True once every required address field is filled in
#[wasm_bindgen]
pub fn is_address_complete(address: JsValue) -> Result<bool, JsValue> {
    let address: ShippingAddress = from_js(address, "address")?;
    Ok(address.is_complete())
}

/// `{ label, disabled }`, or `null` when the button is hidden
#[wasm_bindgen]
pub fn pay_button_state(option_count: usize, loading: bool, selected: &str) -> Result<JsValue, JsValue> {
    match PayButton::state(option_count, loading, selected) {
        Some(button) => serde_wasm_bindgen::to_value(&button)
            .map_err(|e| JsValue::from_str(&format!("Failed to encode pay button: {}", e))),
        None => Ok(JsValue::NULL),
    }
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
