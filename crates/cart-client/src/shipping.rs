//! # Shipping Rate Client
//!
//! `POST /api/shipping` against the storefront backend.

use crate::config::ClientConfig;
use crate::http_client;
use async_trait::async_trait;
use cart_core::{
    CheckoutError, CheckoutResult, ShippingRateClient, ShippingRateRequest, ShippingRatesResponse,
};
use reqwest::Client;
use tracing::{debug, error, instrument};

const ENDPOINT: &str = "shipping";

/// Rate quotes over HTTP
pub struct HttpShippingRateClient {
    url: String,
    client: Client,
}

impl HttpShippingRateClient {
    pub fn new(config: &ClientConfig) -> CheckoutResult<Self> {
        Ok(Self {
            url: config.shipping_url(),
            client: http_client(config)?,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(&ClientConfig::from_env()?)
    }
}

#[async_trait]
impl ShippingRateClient for HttpShippingRateClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn fetch_rates(
        &self,
        request: &ShippingRateRequest,
    ) -> CheckoutResult<ShippingRatesResponse> {
        debug!("POST {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Shipping endpoint error: status={}, body={}", status, body);
            return Err(CheckoutError::EndpointError {
                endpoint: ENDPOINT.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let rates: ShippingRatesResponse = serde_json::from_str(&body).map_err(|e| {
            CheckoutError::Serialization(format!("Failed to parse shipping rates: {}", e))
        })?;

        debug!("Parsed {} shipping options", rates.shipping_options.len());
        Ok(rates)
    }
}
