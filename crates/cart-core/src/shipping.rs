//! # Shipping Types
//!
//! Shipping-rate quotes and the wire types of the shipping-rate endpoint.

use crate::address::ShippingAddress;
use crate::cart::CartItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A quoted carrier/service/price/ETA tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    /// Option ID, used as the radio value
    pub id: String,
    /// Display name (e.g., "Standard")
    pub name: String,
    /// Carrier (e.g., "USPS")
    pub carrier: String,
    /// Carrier service level (e.g., "Ground")
    pub service: String,
    /// Cost in major units
    pub cost: f64,
    /// Currency code as sent by the endpoint; costs are summed in the store currency
    pub currency: String,
    /// Delivery estimate as sent by the endpoint
    pub estimated_days: String,
}

impl ShippingOption {
    /// Label shown next to the radio button
    pub fn label(&self) -> String {
        format!(
            "{} - {} {} ({} days)",
            self.name, self.carrier, self.service, self.estimated_days
        )
    }
}

/// Item as sent to the shipping endpoint (identifiers stripped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingItem {
    pub title: String,
    pub quantity: u32,
    pub price: f64,
}

impl From<&CartItem> for ShippingItem {
    fn from(item: &CartItem) -> Self {
        Self {
            title: item.title.clone(),
            quantity: item.quantity,
            price: item.price,
        }
    }
}

/// Body of `POST /api/shipping`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRateRequest {
    pub address: ShippingAddress,
    pub items: Vec<ShippingItem>,
}

impl ShippingRateRequest {
    pub fn new(address: &ShippingAddress, items: &[CartItem]) -> Self {
        Self {
            address: address.clone(),
            items: items.iter().map(ShippingItem::from).collect(),
        }
    }
}

/// Response of `POST /api/shipping`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRatesResponse {
    #[serde(default)]
    pub shipping_options: Vec<ShippingOption>,
}

/// The options from the most recent applied response, with the address
/// they were computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingQuote {
    pub address: ShippingAddress,
    pub options: Vec<ShippingOption>,
    pub quoted_at: DateTime<Utc>,
}

impl ShippingQuote {
    pub fn new(address: ShippingAddress, options: Vec<ShippingOption>) -> Self {
        Self {
            address,
            options,
            quoted_at: Utc::now(),
        }
    }

    /// True once the form address differs from the quoted one.
    /// Informational only; a stale quote is still selectable.
    pub fn is_stale_for(&self, current: &ShippingAddress) -> bool {
        &self.address != current
    }
}
