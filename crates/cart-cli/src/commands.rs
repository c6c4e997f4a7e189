//! # CLI Commands
//!
//! Each command builds a checkout session over the storefront endpoints and
//! drives the flow the way a shopper would.

use crate::terminal::{TerminalNavigator, TerminalNotifier};
use anyhow::{bail, Context};
use cart_client::{ClientConfig, HttpCheckoutSessionClient, HttpShippingRateClient};
use cart_core::{
    CartFile, CheckoutFlow, CheckoutServices, CheckoutView, FlowConfig, InMemoryCartStore,
    PayOutcome, PaymentClientLoader, ShippingAddress, ShippingOption, ShippingOutcome,
};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Destination address flags
#[derive(Debug, Clone, Args)]
pub struct AddressArgs {
    /// Recipient name
    #[arg(long)]
    pub name: String,

    /// Street address
    #[arg(long)]
    pub street1: String,

    #[arg(long)]
    pub city: String,

    /// State or region code
    #[arg(long)]
    pub state: String,

    /// Postal code
    #[arg(long)]
    pub zip: String,

    /// Country code
    #[arg(long, default_value = cart_core::DEFAULT_COUNTRY)]
    pub country: String,
}

impl From<AddressArgs> for ShippingAddress {
    fn from(args: AddressArgs) -> Self {
        ShippingAddress::new(args.name, args.street1, args.city, args.state, args.zip)
            .with_country(args.country)
    }
}

/// A flow wired to terminal output
pub struct Session {
    pub flow: Arc<CheckoutFlow>,
    pub cart: Arc<InMemoryCartStore>,
    pub navigator: Arc<TerminalNavigator>,
    pub notifier: Arc<TerminalNotifier>,
}

impl Session {
    pub fn open(
        cart: InMemoryCartStore,
        client: &ClientConfig,
        flow_config: FlowConfig,
        payments: Arc<dyn PaymentClientLoader>,
    ) -> anyhow::Result<Self> {
        let cart = Arc::new(cart);
        let navigator = Arc::new(TerminalNavigator::default());
        let notifier = Arc::new(TerminalNotifier::default());

        let services = CheckoutServices {
            cart: cart.clone(),
            rates: Arc::new(HttpShippingRateClient::new(client)?),
            sessions: Arc::new(HttpCheckoutSessionClient::new(client)?),
            payments,
            navigator: navigator.clone(),
            notifier: notifier.clone(),
        };

        let flow = Arc::new(CheckoutFlow::with_config(services, flow_config));
        info!("Checkout session {} opened", flow.id());

        Ok(Self {
            flow,
            cart,
            navigator,
            notifier,
        })
    }

    /// Mount the flow; an empty cart ends the session
    fn mount(&self) -> anyhow::Result<()> {
        if self.flow.mount() {
            bail!("Cart is empty");
        }
        Ok(())
    }
}

/// Read a `[[items]]` cart file
pub fn load_cart(path: &Path) -> anyhow::Result<InMemoryCartStore> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cart file {}", path.display()))?;
    let cart = CartFile::from_toml(&contents)
        .with_context(|| format!("Failed to parse cart file {}", path.display()))?;
    Ok(cart.into_store())
}

/// Cart review step
pub fn summary(session: &Session) -> anyhow::Result<CheckoutView> {
    session.mount()?;
    Ok(session.flow.view())
}

/// Continue to shipping and quote rates for `address`
pub async fn quote(
    session: &Session,
    address: ShippingAddress,
) -> anyhow::Result<Vec<ShippingOption>> {
    session.mount()?;
    session.flow.continue_to_shipping()?;
    session.flow.set_address(address);

    match session.flow.calculate_shipping().await {
        ShippingOutcome::Updated { options } => info!("{} shipping options", options),
        ShippingOutcome::Skipped { missing } => {
            bail!("Address is missing: {}", missing.join(", "))
        }
        ShippingOutcome::Failed(reason) => warn!("Could not calculate shipping: {}", reason),
        ShippingOutcome::Superseded => {}
    }

    Ok(session.flow.shipping_options())
}

/// Quote, pick an option and pay
pub async fn checkout(
    session: &Session,
    address: ShippingAddress,
    option: Option<&str>,
) -> anyhow::Result<PayOutcome> {
    let options = quote(session, address).await?;
    if options.is_empty() {
        bail!("No shipping options available for this address");
    }

    if let Some(option_id) = option {
        session.flow.select_shipping(option_id)?;
    }

    let outcome = session.flow.pay().await?;
    Ok(outcome)
}

/// Hosted checkout URL, or an error once the shopper has been alerted
pub fn redirect_url(outcome: PayOutcome) -> anyhow::Result<Option<String>> {
    match outcome {
        PayOutcome::Redirected(url) => Ok(Some(url)),
        PayOutcome::SessionFailed => bail!(cart_core::SESSION_FAILED_MESSAGE),
        PayOutcome::AlreadyInFlight => Ok(None),
    }
}
