//! Shipping address entered on the checkout form.

use serde::{Deserialize, Serialize};

/// Default destination country (ISO-3166 alpha-2)
pub const DEFAULT_COUNTRY: &str = "US";

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    pub name: String,
    /// Street line.
    pub street1: String,
    /// City.
    pub city: String,
    /// State/province code.
    pub state: String,
    /// Postal/ZIP code.
    pub zip: String,
    /// Country code (e.g., "US").
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl ShippingAddress {
    pub fn new(
        name: impl Into<String>,
        street1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            street1: street1.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
            country: default_country(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Check if the address can be quoted.
    ///
    /// Country is not checked since it always has a default.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("street1", &self.street1),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {} {}, {}",
            self.name, self.street1, self.city, self.state, self.zip, self.country
        )
    }
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            name: String::new(),
            street1: String::new(),
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            country: default_country(),
        }
    }
}
