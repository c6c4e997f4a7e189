//! Order summary math. Everything here is a pure function of the current
//! items and shipping selection, recomputed on every view.

use crate::cart::CartItem;
use crate::money::{Currency, Price};
use crate::shipping::ShippingOption;
use serde::Serialize;

/// Σ price·quantity
pub fn subtotal(items: &[CartItem], currency: Currency) -> Price {
    items
        .iter()
        .map(|item| item.line_total(currency))
        .fold(Price::zero(currency), |acc, line| acc.plus(line))
}

/// Cost of the option whose id matches `selected`, zero otherwise
pub fn shipping_cost(options: &[ShippingOption], selected: &str, currency: Currency) -> Price {
    options
        .iter()
        .find(|option| option.id == selected)
        .map(|option| Price::new(option.cost, currency))
        .unwrap_or_else(|| Price::zero(currency))
}

/// Subtotal, shipping and total for the summary panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

impl OrderSummary {
    pub fn compute(
        items: &[CartItem],
        options: &[ShippingOption],
        selected: &str,
        currency: Currency,
    ) -> Self {
        let subtotal = subtotal(items, currency);
        let shipping = shipping_cost(options, selected, currency);
        Self {
            subtotal,
            shipping,
            total: subtotal.plus(shipping),
        }
    }

    /// Item count across all lines
    pub fn item_count(items: &[CartItem]) -> u32 {
        items.iter().map(|item| item.quantity).sum()
    }
}
