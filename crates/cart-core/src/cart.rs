//! # Cart Types
//!
//! Cart line items and the cart store the checkout flow reads from.
//! The store publishes every change on a `tokio::sync::watch` channel so the
//! flow can re-run its empty-cart guard whenever the contents change.

use crate::money::{Currency, Price};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A line item in the shopper's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Storefront product ID
    pub id: String,

    /// Display title
    pub title: String,

    /// Unit price in major units (dollars)
    pub price: f64,

    /// Quantity (at least 1)
    pub quantity: u32,

    /// Price reference at the payment provider (price_...)
    pub stripe_price_id: String,
}

impl CartItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        price: f64,
        quantity: u32,
        stripe_price_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            quantity,
            stripe_price_id: stripe_price_id.into(),
        }
    }

    /// Unit price in the given cart currency
    pub fn unit_price(&self, currency: Currency) -> Price {
        Price::new(self.price, currency)
    }

    /// Calculate the total price for this line item
    pub fn line_total(&self, currency: Currency) -> Price {
        self.unit_price(currency).times(self.quantity)
    }
}

/// External state container holding the items the shopper wants to buy.
pub trait CartStore: Send + Sync {
    /// Snapshot of the current items
    fn items(&self) -> Vec<CartItem>;

    /// Remove every item
    fn clear(&self);

    /// Receiver that observes every change to the items
    fn subscribe(&self) -> watch::Receiver<Vec<CartItem>>;

    fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

/// In-process cart store backed by a watch channel
#[derive(Debug)]
pub struct InMemoryCartStore {
    tx: watch::Sender<Vec<CartItem>>,
}

impl InMemoryCartStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Create a store seeded with items
    pub fn with_items(items: Vec<CartItem>) -> Self {
        let (tx, _rx) = watch::channel(items);
        Self { tx }
    }

    /// Add an item, merging quantities for the same product ID
    pub fn add(&self, item: CartItem) {
        self.tx.send_modify(|items| {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => existing.quantity += item.quantity,
                None => items.push(item),
            }
        });
    }

    /// Remove a product from the cart
    pub fn remove(&self, id: &str) {
        self.tx.send_modify(|items| items.retain(|item| item.id != id));
    }

    /// Set the quantity of a product; zero removes it
    pub fn set_quantity(&self, id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(id);
            return;
        }
        self.tx.send_modify(|items| {
            if let Some(item) = items.iter_mut().find(|item| item.id == id) {
                item.quantity = quantity;
            }
        });
    }
}

impl Default for InMemoryCartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore for InMemoryCartStore {
    fn items(&self) -> Vec<CartItem> {
        self.tx.borrow().clone()
    }

    fn clear(&self) {
        self.tx.send_replace(Vec::new());
    }

    fn subscribe(&self) -> watch::Receiver<Vec<CartItem>> {
        self.tx.subscribe()
    }
}

/// Cart contents as stored in a TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartFile {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl CartFile {
    /// Load cart contents from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn into_store(self) -> InMemoryCartStore {
        InMemoryCartStore::with_items(self.items)
    }
}
