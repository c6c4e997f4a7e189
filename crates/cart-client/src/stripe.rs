//! # Stripe.js Client Loader
//!
//! Initialises the Stripe client handle once per process and hands out the
//! same `Arc` on every later call. Concurrent first calls share a single
//! initialisation.

use async_trait::async_trait;
use cart_core::{CheckoutError, CheckoutResult, PaymentClientHandle, PaymentClientLoader};
use std::env;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Browser-exposed key name used by the storefront
pub const PUBLIC_KEY_VAR: &str = "NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY";
pub const KEY_VAR: &str = "STRIPE_PUBLISHABLE_KEY";

static PROCESS_CLIENT: OnceCell<Arc<PaymentClientHandle>> = OnceCell::const_new();

enum Slot {
    Process,
    Owned(OnceCell<Arc<PaymentClientHandle>>),
}

impl Slot {
    fn cell(&self) -> &OnceCell<Arc<PaymentClientHandle>> {
        match self {
            Slot::Process => &PROCESS_CLIENT,
            Slot::Owned(cell) => cell,
        }
    }
}

/// Lazy Stripe client
pub struct StripeClientLoader {
    /// Explicit key; read from the environment on first load when unset
    publishable_key: Option<String>,
    slot: Slot,
}

impl StripeClientLoader {
    /// Process-wide loader reading the key from the environment.
    ///
    /// Env vars (first one set wins):
    /// - `NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY`
    /// - `STRIPE_PUBLISHABLE_KEY`
    pub fn from_env() -> Self {
        Self {
            publishable_key: None,
            slot: Slot::Process,
        }
    }

    /// Loader with its own slot and an explicit key (for testing)
    pub fn with_key(publishable_key: impl Into<String>) -> Self {
        Self {
            publishable_key: Some(publishable_key.into()),
            slot: Slot::Owned(OnceCell::new()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.cell().initialized()
    }

    fn resolve_key(&self) -> CheckoutResult<String> {
        if let Some(key) = &self.publishable_key {
            return Ok(key.clone());
        }

        dotenvy::dotenv().ok();
        env::var(PUBLIC_KEY_VAR)
            .or_else(|_| env::var(KEY_VAR))
            .map_err(|_| {
                CheckoutError::Configuration(format!("{} not set", PUBLIC_KEY_VAR))
            })
    }
}

/// Publishable keys are `pk_test_...` or `pk_live_...`
pub fn validate_publishable_key(key: &str) -> CheckoutResult<()> {
    if key.starts_with("pk_test_") || key.starts_with("pk_live_") {
        Ok(())
    } else {
        Err(CheckoutError::Configuration(
            "Stripe publishable key must start with pk_test_ or pk_live_".to_string(),
        ))
    }
}

#[async_trait]
impl PaymentClientLoader for StripeClientLoader {
    async fn load(&self) -> CheckoutResult<Arc<PaymentClientHandle>> {
        let handle = self
            .slot
            .cell()
            .get_or_try_init(|| async {
                let publishable_key = self.resolve_key()?;
                validate_publishable_key(&publishable_key)?;

                let handle = PaymentClientHandle {
                    provider: "stripe".to_string(),
                    publishable_key,
                };
                info!("Stripe client initialised (live={})", handle.is_live());
                Ok::<_, CheckoutError>(Arc::new(handle))
            })
            .await?;

        debug!("Using Stripe client");
        Ok(handle.clone())
    }
}
