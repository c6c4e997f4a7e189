//! # Checkout Session Client
//!
//! `POST /api/stripe/checkout` against the storefront backend. The backend
//! creates the provider session from price references and returns its
//! hosted page URL.
//!
//! A non-2xx response is reported as a session with no URL so the flow shows
//! its usual failure alert. Only transport failures surface as errors.

use crate::config::ClientConfig;
use crate::http_client;
use async_trait::async_trait;
use cart_core::{
    CheckoutError, CheckoutResult, CheckoutSessionClient, CheckoutSessionRequest,
    CheckoutSessionResponse,
};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Checkout sessions over HTTP
pub struct HttpCheckoutSessionClient {
    url: String,
    client: Client,
    idempotency_keys: bool,
}

impl HttpCheckoutSessionClient {
    pub fn new(config: &ClientConfig) -> CheckoutResult<Self> {
        Ok(Self {
            url: config.checkout_url(),
            client: http_client(config)?,
            idempotency_keys: config.idempotency_keys,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> CheckoutResult<Self> {
        Self::new(&ClientConfig::from_env()?)
    }
}

#[async_trait]
impl CheckoutSessionClient for HttpCheckoutSessionClient {
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> CheckoutResult<CheckoutSessionResponse> {
        let mut builder = self.client.post(&self.url).json(request);
        if self.idempotency_keys {
            let key = Uuid::new_v4().to_string();
            debug!("Idempotency-Key: {}", key);
            builder = builder.header("Idempotency-Key", key);
        }

        debug!("POST {}", self.url);

        let response = builder
            .send()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CheckoutError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Checkout endpoint error: status={}, body={}", status, body);
            return Ok(CheckoutSessionResponse::default());
        }

        let session: CheckoutSessionResponse = match serde_json::from_str(&body) {
            Ok(session) => session,
            Err(e) => {
                warn!("Unreadable checkout response: {}", e);
                CheckoutSessionResponse::default()
            }
        };

        match &session.url {
            Some(url) => info!("Checkout session created: url={}", url),
            None => warn!("Checkout response has no url"),
        }

        Ok(session)
    }
}
