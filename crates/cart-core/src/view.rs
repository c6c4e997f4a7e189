//! # Checkout Views
//!
//! Render-ready snapshots of the checkout flow. A front end (terminal, HTML,
//! WASM) draws these without re-deriving any checkout rules.

use crate::address::ShippingAddress;
use crate::cart::CartItem;
use crate::money::{Currency, Price};
use crate::shipping::ShippingOption;
use crate::totals::OrderSummary;
use serde::Serialize;

pub const CONTINUE_LABEL: &str = "Continue to Shipping";
pub const CALCULATE_LABEL: &str = "Calculate Shipping";
pub const CALCULATING_LABEL: &str = "Calculating...";
pub const PAY_LABEL: &str = "Pay with Stripe";

/// One read-only cart line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineView {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

impl LineView {
    fn from_item(item: &CartItem, currency: Currency) -> Self {
        Self {
            title: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price(currency),
            line_total: item.line_total(currency),
        }
    }
}

/// Cart review step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    pub subtotal: Price,
    pub continue_label: &'static str,
}

/// A radio choice in the shipping option list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingOptionView {
    pub option: ShippingOption,
    pub label: String,
    pub selected: bool,
}

/// The final pay control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayButton {
    pub label: &'static str,
    pub disabled: bool,
}

impl PayButton {
    /// Rendered only once options exist; disabled while a checkout request
    /// is in flight or nothing is selected.
    pub fn state(option_count: usize, loading: bool, selected: &str) -> Option<Self> {
        if option_count == 0 {
            return None;
        }
        Some(Self {
            label: PAY_LABEL,
            disabled: loading || selected.is_empty(),
        })
    }
}

/// Address form, rate calculation and payment step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingView {
    pub address: ShippingAddress,
    pub calculate_label: &'static str,
    pub loading_shipping: bool,
    pub lines: Vec<LineView>,
    pub summary: OrderSummary,
    pub options: Vec<ShippingOptionView>,
    pub selected_shipping: String,
    pub pay_button: Option<PayButton>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutView {
    Cart(CartView),
    Shipping(ShippingView),
}

impl CheckoutView {
    pub fn cart(items: &[CartItem], currency: Currency) -> Self {
        let summary = OrderSummary::compute(items, &[], "", currency);
        CheckoutView::Cart(CartView {
            lines: lines(items, currency),
            subtotal: summary.subtotal,
            continue_label: CONTINUE_LABEL,
        })
    }

    pub fn shipping(
        items: &[CartItem],
        address: &ShippingAddress,
        options: &[ShippingOption],
        selected: &str,
        loading_shipping: bool,
        loading: bool,
        currency: Currency,
    ) -> Self {
        CheckoutView::Shipping(ShippingView {
            address: address.clone(),
            calculate_label: if loading_shipping {
                CALCULATING_LABEL
            } else {
                CALCULATE_LABEL
            },
            loading_shipping,
            lines: lines(items, currency),
            summary: OrderSummary::compute(items, options, selected, currency),
            options: options
                .iter()
                .map(|option| ShippingOptionView {
                    label: option.label(),
                    selected: option.id == selected,
                    option: option.clone(),
                })
                .collect(),
            selected_shipping: selected.to_string(),
            pay_button: PayButton::state(options.len(), loading, selected),
        })
    }

    pub fn pay_button(&self) -> Option<PayButton> {
        match self {
            CheckoutView::Cart(_) => None,
            CheckoutView::Shipping(view) => view.pay_button,
        }
    }
}

fn lines(items: &[CartItem], currency: Currency) -> Vec<LineView> {
    items
        .iter()
        .map(|item| LineView::from_item(item, currency))
        .collect()
}
