//! # parts-checkout
//!
//! Drive the storefront checkout from a terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Point at the storefront
//! export STOREFRONT_BASE_URL=http://localhost:3000
//! export NEXT_PUBLIC_STRIPE_PUBLISHABLE_KEY=pk_test_...
//!
//! # Review the cart
//! parts-checkout summary --cart cart.toml
//!
//! # Quote shipping
//! parts-checkout quote --cart cart.toml --name "Ada Lovelace" \
//!     --street1 "1 Main St" --city Austin --state TX --zip 73301
//!
//! # Pay
//! parts-checkout checkout --cart cart.toml ... --option usps_ground
//! ```

use cart_cli::commands::{self, AddressArgs, Session};
use cart_cli::terminal::render;
use cart_client::{ClientConfig, StripeClientLoader};
use cart_core::FlowConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "parts-checkout")]
#[command(author, version, about = "Refurbished parts storefront checkout")]
struct Cli {
    /// Cart file (`[[items]]` tables)
    #[arg(long, global = true, default_value = "cart.toml")]
    cart: PathBuf,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart and subtotal
    Summary,
    /// Quote shipping rates for an address
    Quote {
        #[command(flatten)]
        address: AddressArgs,
    },
    /// Quote, select an option and create a checkout session
    Checkout {
        #[command(flatten)]
        address: AddressArgs,

        /// Shipping option id (defaults to the first quoted option)
        #[arg(long)]
        option: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if cli.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let client_config = ClientConfig::from_env()?;
    let flow_config = FlowConfig::from_env()?;
    info!("Storefront: {}", client_config.base_url);

    let cart = commands::load_cart(&cli.cart)?;
    let session = Session::open(
        cart,
        &client_config,
        flow_config,
        Arc::new(StripeClientLoader::from_env()),
    )?;

    match cli.command {
        Commands::Summary => {
            let view = commands::summary(&session)?;
            print!("{}", render(&view));
        }
        Commands::Quote { address } => {
            let options = commands::quote(&session, address.into()).await?;
            print!("{}", render(&session.flow.view()));
            if options.is_empty() {
                println!("No shipping options available");
            }
        }
        Commands::Checkout { address, option } => {
            let outcome = commands::checkout(&session, address.into(), option.as_deref()).await?;
            print!("{}", render(&session.flow.view()));
            if let Some(url) = commands::redirect_url(outcome)? {
                println!("Checkout: {}", url);
            }
        }
    }

    Ok(())
}
