//! # Checkout Flow
//!
//! Cart review → shipping address and rate quote → hosted checkout redirect.
//!
//! The flow is shared behind an `Arc` by whatever drives it. State sits in a
//! `Mutex` that is never held across an `.await`, so a rate quote and a cart
//! change can interleave freely.
//!
//! - Rate quotes carry a monotonic generation; only the latest request's
//!   response is applied.
//! - `pay()` claims an in-flight flag with a compare-and-swap before anything
//!   else, so overlapping clicks send one checkout-session request.
//! - The displayed total is never sent to the checkout endpoint.

use crate::address::ShippingAddress;
use crate::cart::{CartItem, CartStore};
use crate::error::{CheckoutError, CheckoutResult};
use crate::money::Currency;
use crate::ports::{
    CheckoutSessionClient, CheckoutSessionRequest, Navigation, Navigator, Notifier,
    PaymentClientLoader, ShippingRateClient,
};
use crate::shipping::{ShippingOption, ShippingQuote, ShippingRateRequest};
use crate::totals::OrderSummary;
use crate::view::{CheckoutView, PayButton};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Alert shown when the checkout endpoint returns no session URL
pub const SESSION_FAILED_MESSAGE: &str = "Failed to create checkout session";

/// Default in-app route for the cart page
pub const DEFAULT_CART_PATH: &str = "/cart";

/// Steps in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Cart review.
    #[default]
    Cart,
    /// Address, rate quote and pay button.
    Shipping,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Cart => "cart",
            CheckoutStep::Shipping => "shipping",
        }
    }
}

/// Whether the flow empties the cart when it hands off to the payment page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartClearPolicy {
    /// Leave the cart alone (cleared later by the order backend)
    #[default]
    Never,
    /// Clear right before the redirect
    BeforeRedirect,
}

impl CartClearPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "before_redirect" => Some(CartClearPolicy::BeforeRedirect),
            "0" | "false" | "no" | "never" => Some(CartClearPolicy::Never),
            _ => None,
        }
    }
}

/// Flow settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Route the empty-cart guard sends the shopper to
    pub cart_path: String,
    /// Cart clear hook
    pub clear_cart: CartClearPolicy,
    /// Currency of cart prices and shipping costs
    pub currency: Currency,
}

impl FlowConfig {
    /// Load from environment variables.
    ///
    /// - `CART_PATH` (default `/cart`)
    /// - `CLEAR_CART_ON_REDIRECT` (default off)
    /// - `STORE_CURRENCY` (default `usd`)
    pub fn from_env() -> CheckoutResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(path) = std::env::var("CART_PATH") {
            config = config.with_cart_path(path);
        }

        if let Ok(value) = std::env::var("CLEAR_CART_ON_REDIRECT") {
            let policy = CartClearPolicy::parse(&value).ok_or_else(|| {
                CheckoutError::Configuration(format!(
                    "CLEAR_CART_ON_REDIRECT must be true or false, got {}",
                    value
                ))
            })?;
            config = config.with_clear_cart(policy);
        }

        if let Ok(code) = std::env::var("STORE_CURRENCY") {
            let currency = Currency::from_code(&code).ok_or_else(|| {
                CheckoutError::Configuration(format!("Unsupported STORE_CURRENCY: {}", code))
            })?;
            config = config.with_currency(currency);
        }

        Ok(config)
    }

    pub fn with_cart_path(mut self, path: impl Into<String>) -> Self {
        self.cart_path = path.into();
        self
    }

    pub fn with_clear_cart(mut self, policy: CartClearPolicy) -> Self {
        self.clear_cart = policy;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            cart_path: DEFAULT_CART_PATH.to_string(),
            clear_cart: CartClearPolicy::Never,
            currency: Currency::USD,
        }
    }
}

/// Result of a `calculate_shipping` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingOutcome {
    /// Address incomplete; nothing was sent
    Skipped { missing: Vec<&'static str> },
    /// Options replaced with a fresh quote
    Updated { options: usize },
    /// A newer request was issued while this one was in flight
    Superseded,
    /// Request or parse failed; options left untouched
    Failed(String),
}

/// Result of a `pay` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayOutcome {
    /// Browser sent to the hosted checkout page
    Redirected(String),
    /// No session URL came back; the shopper was alerted
    SessionFailed,
    /// Another checkout request is still running
    AlreadyInFlight,
}

/// Everything the flow talks to
#[derive(Clone)]
pub struct CheckoutServices {
    pub cart: Arc<dyn CartStore>,
    pub rates: Arc<dyn ShippingRateClient>,
    pub sessions: Arc<dyn CheckoutSessionClient>,
    pub payments: Arc<dyn PaymentClientLoader>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Default)]
struct FlowState {
    step: CheckoutStep,
    address: ShippingAddress,
    quote: Option<ShippingQuote>,
    selected_shipping: String,
    loading_shipping: bool,
    redirected_to: Option<String>,
}

impl FlowState {
    fn options(&self) -> &[ShippingOption] {
        self.quote
            .as_ref()
            .map(|quote| quote.options.as_slice())
            .unwrap_or(&[])
    }
}

/// Checkout orchestration for one shopper session
pub struct CheckoutFlow {
    id: String,
    config: FlowConfig,
    services: CheckoutServices,
    state: Mutex<FlowState>,
    shipping_generation: AtomicU64,
    loading: AtomicBool,
}

impl CheckoutFlow {
    pub fn new(services: CheckoutServices) -> Self {
        Self::with_config(services, FlowConfig::default())
    }

    pub fn with_config(services: CheckoutServices, config: FlowConfig) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            config,
            services,
            state: Mutex::new(FlowState::default()),
            shipping_generation: AtomicU64::new(0),
            loading: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Cart guard
    // =========================================================================

    /// Run the empty-cart guard once, as on first render.
    ///
    /// Returns true if the shopper was sent back to the cart page.
    pub fn mount(&self) -> bool {
        self.enforce_cart_guard()
    }

    /// Navigate to the cart page if the cart is empty
    pub fn enforce_cart_guard(&self) -> bool {
        self.guard_items(&self.services.cart.items())
    }

    fn guard_items(&self, items: &[CartItem]) -> bool {
        if !items.is_empty() {
            return false;
        }
        if self.state().redirected_to.is_some() {
            // Leaving for the payment page already
            return false;
        }
        info!(flow_id = %self.id, "Cart is empty, returning to {}", self.config.cart_path);
        self.services
            .navigator
            .navigate(Navigation::Route(self.config.cart_path.clone()));
        true
    }

    /// Re-run the guard on every cart change.
    ///
    /// The task ends once it has navigated away, when the store goes away, or
    /// when the flow is dropped.
    pub fn watch_cart(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.services.cart.subscribe();
        let flow: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(flow) = flow.upgrade() else {
                    break;
                };
                let items = rx.borrow_and_update().clone();
                debug!(flow_id = %flow.id, items = items.len(), "Cart changed");
                if flow.guard_items(&items) {
                    break;
                }
            }
        })
    }

    // =========================================================================
    // Steps and form state
    // =========================================================================

    pub fn step(&self) -> CheckoutStep {
        self.state().step
    }

    /// Forward button on the cart step
    pub fn continue_to_shipping(&self) -> CheckoutResult<()> {
        let mut state = self.state();
        match state.step {
            CheckoutStep::Cart => {
                state.step = CheckoutStep::Shipping;
                debug!(flow_id = %self.id, "Continuing to shipping");
                Ok(())
            }
            other => Err(CheckoutError::InvalidStepTransition {
                from: other.as_str().to_string(),
                to: CheckoutStep::Shipping.as_str().to_string(),
            }),
        }
    }

    pub fn address(&self) -> ShippingAddress {
        self.state().address.clone()
    }

    /// Replace the form address. Existing options are kept.
    pub fn set_address(&self, address: ShippingAddress) {
        self.state().address = address;
    }

    /// Edit the form address in place
    pub fn update_address(&self, edit: impl FnOnce(&mut ShippingAddress)) {
        edit(&mut self.state().address);
    }

    pub fn shipping_options(&self) -> Vec<ShippingOption> {
        self.state().options().to_vec()
    }

    pub fn selected_shipping(&self) -> String {
        self.state().selected_shipping.clone()
    }

    pub fn is_loading_shipping(&self) -> bool {
        self.state().loading_shipping
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// URL of the hosted checkout page once `pay()` has redirected
    pub fn redirected_to(&self) -> Option<String> {
        self.state().redirected_to.clone()
    }

    /// True when the address was edited after the current quote was fetched
    pub fn is_quote_stale(&self) -> bool {
        let state = self.state();
        state
            .quote
            .as_ref()
            .map(|quote| quote.is_stale_for(&state.address))
            .unwrap_or(false)
    }

    /// Pick one of the quoted options
    pub fn select_shipping(&self, option_id: &str) -> CheckoutResult<()> {
        let mut state = self.state();
        if !state.options().iter().any(|option| option.id == option_id) {
            return Err(CheckoutError::UnknownShippingOption {
                option_id: option_id.to_string(),
            });
        }
        state.selected_shipping = option_id.to_string();
        Ok(())
    }

    /// Current totals
    pub fn summary(&self) -> OrderSummary {
        let items = self.services.cart.items();
        let state = self.state();
        OrderSummary::compute(
            &items,
            state.options(),
            &state.selected_shipping,
            self.config.currency,
        )
    }

    /// Render-ready snapshot of the current step
    pub fn view(&self) -> CheckoutView {
        let items = self.services.cart.items();
        let state = self.state();
        match state.step {
            CheckoutStep::Cart => CheckoutView::cart(&items, self.config.currency),
            CheckoutStep::Shipping => CheckoutView::shipping(
                &items,
                &state.address,
                state.options(),
                &state.selected_shipping,
                state.loading_shipping,
                self.is_loading(),
                self.config.currency,
            ),
        }
    }

    // =========================================================================
    // Shipping quote
    // =========================================================================

    /// Request rate quotes for the form address.
    ///
    /// Failures are logged and reported through the outcome only; the shopper
    /// just sees no options.
    #[instrument(skip(self), fields(flow_id = %self.id))]
    pub async fn calculate_shipping(&self) -> ShippingOutcome {
        let address = self.address();
        let missing = address.missing_fields();
        if !missing.is_empty() {
            debug!("Address incomplete, skipping rate quote: {:?}", missing);
            return ShippingOutcome::Skipped { missing };
        }

        let items = self.services.cart.items();
        let request = ShippingRateRequest::new(&address, &items);
        let generation = self.shipping_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state().loading_shipping = true;
        let _in_flight = QuoteInFlight {
            flow: self,
            generation,
        };

        debug!(
            "Requesting shipping rates: generation={}, {} items, to {}",
            generation,
            request.items.len(),
            address.one_line()
        );

        let result = self.services.rates.fetch_rates(&request).await;

        let mut state = self.state();
        if self.shipping_generation.load(Ordering::SeqCst) != generation {
            warn!("Discarding rate quote {}: a newer request is in flight", generation);
            return ShippingOutcome::Superseded;
        }
        state.loading_shipping = false;

        match result {
            Ok(response) => {
                let options = response.shipping_options;
                state.selected_shipping = options
                    .first()
                    .map(|option| option.id.clone())
                    .unwrap_or_default();
                let count = options.len();
                let quote = ShippingQuote::new(address, options);
                info!(
                    "Received {} shipping options at {}, selected={:?}",
                    count,
                    quote.quoted_at.to_rfc3339(),
                    state.selected_shipping
                );
                state.quote = Some(quote);
                ShippingOutcome::Updated { options: count }
            }
            Err(e) => {
                error!("Error calculating shipping: {}", e);
                ShippingOutcome::Failed(e.to_string())
            }
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Create a hosted checkout session and redirect to it.
    ///
    /// Only price references and quantities are sent; the backend decides the
    /// amount charged.
    #[instrument(skip(self), fields(flow_id = %self.id))]
    pub async fn pay(&self) -> CheckoutResult<PayOutcome> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Checkout already in progress");
            return Ok(PayOutcome::AlreadyInFlight);
        }

        match self.create_session_and_redirect().await {
            // Page is navigating away; the flag stays set
            Ok(PayOutcome::Redirected(url)) => Ok(PayOutcome::Redirected(url)),
            Ok(outcome) => {
                self.loading.store(false, Ordering::SeqCst);
                Ok(outcome)
            }
            Err(e) => {
                error!("Checkout failed: {}", e);
                self.loading.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn ensure_payable(&self) -> CheckoutResult<()> {
        let state = self.state();
        if state.step != CheckoutStep::Shipping {
            return Err(CheckoutError::InvalidStepTransition {
                from: state.step.as_str().to_string(),
                to: "payment".to_string(),
            });
        }
        match PayButton::state(state.options().len(), false, &state.selected_shipping) {
            Some(button) if !button.disabled => Ok(()),
            _ => Err(CheckoutError::InvalidRequest(
                "No shipping option selected".to_string(),
            )),
        }
    }

    async fn create_session_and_redirect(&self) -> CheckoutResult<PayOutcome> {
        self.ensure_payable()?;

        let client = self.services.payments.load().await?;
        debug!(
            "Payment client ready: provider={}, live={}",
            client.provider,
            client.is_live()
        );

        let items = self.services.cart.items();
        if items.is_empty() {
            return Err(CheckoutError::InvalidRequest("Cart is empty".to_string()));
        }

        let summary = self.summary();
        info!(
            "Creating checkout session: {} items, subtotal={}, shipping={}, total={}",
            OrderSummary::item_count(&items),
            summary.subtotal,
            summary.shipping,
            summary.total
        );

        let request = CheckoutSessionRequest::from_items(&items);
        let response = self.services.sessions.create_session(&request).await?;

        match response.url.filter(|url| !url.is_empty()) {
            Some(url) => {
                self.state().redirected_to = Some(url.clone());
                if self.config.clear_cart == CartClearPolicy::BeforeRedirect {
                    debug!("Clearing cart before redirect");
                    self.services.cart.clear();
                }
                info!("Redirecting to checkout session: {}", url);
                self.services
                    .navigator
                    .navigate(Navigation::External(url.clone()));
                Ok(PayOutcome::Redirected(url))
            }
            None => {
                warn!("Checkout endpoint returned no session URL");
                self.services.notifier.alert(SESSION_FAILED_MESSAGE);
                Ok(PayOutcome::SessionFailed)
            }
        }
    }
}

/// Clears `loading_shipping` if the latest quote request is dropped before
/// it completes.
struct QuoteInFlight<'a> {
    flow: &'a CheckoutFlow,
    generation: u64,
}

impl Drop for QuoteInFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.flow.state();
        if self.flow.shipping_generation.load(Ordering::SeqCst) == self.generation {
            state.loading_shipping = false;
        }
    }
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("state", &*self.state())
            .field("loading", &self.is_loading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::InMemoryCartStore;
    use crate::ports::{CheckoutSessionResponse, PaymentClientHandle};
    use crate::shipping::ShippingRatesResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    struct Scripted<T> {
        gate: Option<oneshot::Receiver<()>>,
        result: Result<T, String>,
    }

    impl<T> Scripted<T> {
        fn ready(result: Result<T, String>) -> Self {
            Self { gate: None, result }
        }

        fn gated(gate: oneshot::Receiver<()>, result: Result<T, String>) -> Self {
            Self {
                gate: Some(gate),
                result,
            }
        }
    }

    #[derive(Default)]
    struct FakeRates {
        script: Mutex<VecDeque<Scripted<Vec<ShippingOption>>>>,
        requests: Mutex<Vec<ShippingRateRequest>>,
    }

    impl FakeRates {
        fn push(&self, step: Scripted<Vec<ShippingOption>>) {
            self.script.lock().unwrap().push_back(step);
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ShippingRateClient for FakeRates {
        async fn fetch_rates(
            &self,
            request: &ShippingRateRequest,
        ) -> CheckoutResult<ShippingRatesResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected rate request");
            if let Some(gate) = step.gate {
                gate.await.ok();
            }
            step.result
                .map(|shipping_options| ShippingRatesResponse { shipping_options })
                .map_err(CheckoutError::NetworkError)
        }
    }

    #[derive(Default)]
    struct FakeSessions {
        script: Mutex<VecDeque<Scripted<CheckoutSessionResponse>>>,
        requests: Mutex<Vec<CheckoutSessionRequest>>,
    }

    impl FakeSessions {
        fn push(&self, step: Scripted<CheckoutSessionResponse>) {
            self.script.lock().unwrap().push_back(step);
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CheckoutSessionClient for FakeSessions {
        async fn create_session(
            &self,
            request: &CheckoutSessionRequest,
        ) -> CheckoutResult<CheckoutSessionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected session request");
            if let Some(gate) = step.gate {
                gate.await.ok();
            }
            step.result.map_err(CheckoutError::NetworkError)
        }
    }

    #[derive(Default)]
    struct FakePayments {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl PaymentClientLoader for FakePayments {
        async fn load(&self) -> CheckoutResult<Arc<PaymentClientHandle>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(PaymentClientHandle {
                provider: "stripe".to_string(),
                publishable_key: "pk_test_123".to_string(),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<Navigation>>,
    }

    impl RecordingNavigator {
        fn visits(&self) -> Vec<Navigation> {
            self.visits.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, to: Navigation) {
            self.visits.lock().unwrap().push(to);
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn alert(&self, message: &str) {
            self.alerts.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        flow: Arc<CheckoutFlow>,
        cart: Arc<InMemoryCartStore>,
        rates: Arc<FakeRates>,
        sessions: Arc<FakeSessions>,
        payments: Arc<FakePayments>,
        navigator: Arc<RecordingNavigator>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(items: Vec<CartItem>, config: FlowConfig) -> Harness {
        let cart = Arc::new(InMemoryCartStore::with_items(items));
        let rates = Arc::new(FakeRates::default());
        let sessions = Arc::new(FakeSessions::default());
        let payments = Arc::new(FakePayments::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let services = CheckoutServices {
            cart: cart.clone(),
            rates: rates.clone(),
            sessions: sessions.clone(),
            payments: payments.clone(),
            navigator: navigator.clone(),
            notifier: notifier.clone(),
        };

        Harness {
            flow: Arc::new(CheckoutFlow::with_config(services, config)),
            cart,
            rates,
            sessions,
            payments,
            navigator,
            notifier,
        }
    }

    fn harness(items: Vec<CartItem>) -> Harness {
        harness_with(items, FlowConfig::default())
    }

    fn screen_cart() -> Vec<CartItem> {
        vec![CartItem::new("screen", "Screen", 50.0, 2, "price_screen")]
    }

    fn full_address() -> ShippingAddress {
        ShippingAddress::new("Ada Lovelace", "1 Main St", "Austin", "TX", "73301")
    }

    fn option(id: &str, cost: f64) -> ShippingOption {
        ShippingOption {
            id: id.to_string(),
            name: "Standard".to_string(),
            carrier: "USPS".to_string(),
            service: "Ground".to_string(),
            cost,
            currency: "USD".to_string(),
            estimated_days: "3".to_string(),
        }
    }

    fn session_url(url: &str) -> CheckoutSessionResponse {
        CheckoutSessionResponse {
            url: Some(url.to_string()),
        }
    }

    /// Cart → Shipping with a complete address and one quoted option
    async fn quoted(h: &Harness) {
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());
        h.rates.push(Scripted::ready(Ok(vec![option("a", 5.0)])));
        assert_eq!(
            h.flow.calculate_shipping().await,
            ShippingOutcome::Updated { options: 1 }
        );
    }

    // -------------------------------------------------------------------------
    // Cart guard
    // -------------------------------------------------------------------------

    #[test]
    fn test_mount_with_empty_cart_redirects() {
        let h = harness(Vec::new());

        assert!(h.flow.mount());
        assert_eq!(h.navigator.visits(), vec![Navigation::Route("/cart".into())]);
    }

    #[test]
    fn test_mount_with_items_stays() {
        let h = harness(screen_cart());

        assert!(!h.flow.mount());
        assert!(h.navigator.visits().is_empty());
    }

    #[test]
    fn test_guard_fires_from_shipping_step() {
        let h = harness_with(screen_cart(), FlowConfig::default().with_cart_path("/shop/cart"));
        h.flow.continue_to_shipping().unwrap();

        h.cart.clear();

        assert!(h.flow.enforce_cart_guard());
        assert_eq!(
            h.navigator.visits(),
            vec![Navigation::Route("/shop/cart".into())]
        );
    }

    #[tokio::test]
    async fn test_watch_cart_redirects_when_emptied() {
        let h = harness(screen_cart());
        let watcher = h.flow.watch_cart();

        h.cart.set_quantity("screen", 1);
        h.cart.remove("screen");

        watcher.await.unwrap();
        assert_eq!(h.navigator.visits(), vec![Navigation::Route("/cart".into())]);
    }

    // -------------------------------------------------------------------------
    // Steps
    // -------------------------------------------------------------------------

    #[test]
    fn test_continue_to_shipping() {
        let h = harness(screen_cart());
        assert_eq!(h.flow.step(), CheckoutStep::Cart);

        h.flow.continue_to_shipping().unwrap();
        assert_eq!(h.flow.step(), CheckoutStep::Shipping);

        assert!(matches!(
            h.flow.continue_to_shipping(),
            Err(CheckoutError::InvalidStepTransition { .. })
        ));
    }

    #[test]
    fn test_cart_view_subtotal() {
        let h = harness(screen_cart());

        let CheckoutView::Cart(view) = h.flow.view() else {
            panic!("expected cart view");
        };
        assert_eq!(view.subtotal.as_decimal(), 100.0);
        assert_eq!(view.lines.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Shipping quote
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_incomplete_address_sends_nothing() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();

        for field in ["name", "street1", "city", "state", "zip"] {
            let mut address = full_address();
            match field {
                "name" => address.name.clear(),
                "street1" => address.street1.clear(),
                "city" => address.city.clear(),
                "state" => address.state.clear(),
                _ => address.zip.clear(),
            }
            h.flow.set_address(address);

            assert_eq!(
                h.flow.calculate_shipping().await,
                ShippingOutcome::Skipped {
                    missing: vec![field]
                }
            );
        }

        assert_eq!(h.rates.calls(), 0);
        assert!(!h.flow.is_loading_shipping());
    }

    #[tokio::test]
    async fn test_complete_address_sends_one_request() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());
        h.rates.push(Scripted::ready(Ok(vec![option("a", 5.0)])));

        h.flow.calculate_shipping().await;

        assert_eq!(h.rates.calls(), 1);
        let request = h.rates.requests.lock().unwrap()[0].clone();
        assert_eq!(request.address, full_address());
        assert_eq!(request.items[0].title, "Screen");
        assert_eq!(request.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_screen_scenario_totals() {
        let h = harness(screen_cart());
        quoted(&h).await;

        assert_eq!(h.flow.selected_shipping(), "a");
        let summary = h.flow.summary();
        assert_eq!(summary.subtotal.as_decimal(), 100.0);
        assert_eq!(summary.total.as_decimal(), 105.0);

        let CheckoutView::Shipping(view) = h.flow.view() else {
            panic!("expected shipping view");
        };
        assert_eq!(view.calculate_label, "Calculate Shipping");
        assert_eq!(view.pay_button.map(|b| b.disabled), Some(false));
    }

    #[tokio::test]
    async fn test_no_options_scenario() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());
        h.rates.push(Scripted::ready(Ok(Vec::new())));

        assert_eq!(
            h.flow.calculate_shipping().await,
            ShippingOutcome::Updated { options: 0 }
        );

        assert_eq!(h.flow.selected_shipping(), "");
        assert_eq!(h.flow.view().pay_button(), None);
        let summary = h.flow.summary();
        assert_eq!(summary.total, summary.subtotal);
    }

    #[tokio::test]
    async fn test_requote_replaces_options_and_reselects_first() {
        let h = harness(screen_cart());
        quoted(&h).await;

        h.rates
            .push(Scripted::ready(Ok(vec![option("x", 9.0), option("y", 20.0)])));
        h.flow.calculate_shipping().await;

        let ids: Vec<_> = h.flow.shipping_options().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(h.flow.selected_shipping(), "x");
    }

    #[tokio::test]
    async fn test_failed_quote_is_swallowed() {
        let h = harness(screen_cart());
        quoted(&h).await;

        h.rates.push(Scripted::ready(Err("connection reset".into())));
        let outcome = h.flow.calculate_shipping().await;

        assert!(matches!(outcome, ShippingOutcome::Failed(_)));
        assert!(!h.flow.is_loading_shipping());
        assert_eq!(h.flow.shipping_options().len(), 1);
        assert!(h.notifier.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_quote_wins() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());

        let (release, gate) = oneshot::channel();
        h.rates
            .push(Scripted::gated(gate, Ok(vec![option("stale", 1.0)])));
        h.rates.push(Scripted::ready(Ok(vec![option("fresh", 7.0)])));

        let slow = h.flow.calculate_shipping();
        let fast = async {
            let outcome = h.flow.calculate_shipping().await;
            release.send(()).unwrap();
            outcome
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow, ShippingOutcome::Superseded);
        assert_eq!(fast, ShippingOutcome::Updated { options: 1 });
        assert_eq!(h.flow.selected_shipping(), "fresh");
        assert!(!h.flow.is_loading_shipping());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_latest_quote_clears_loading() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());

        let (release_old, old_gate) = oneshot::channel();
        let (_hold_new, new_gate) = oneshot::channel::<()>();
        h.rates
            .push(Scripted::gated(old_gate, Ok(vec![option("old", 1.0)])));
        h.rates
            .push(Scripted::gated(new_gate, Ok(vec![option("new", 2.0)])));

        let old = h.flow.calculate_shipping();
        let abandoned = async {
            let timed_out =
                tokio::time::timeout(Duration::from_millis(10), h.flow.calculate_shipping()).await;
            assert!(timed_out.is_err());
            assert!(!h.flow.is_loading_shipping());
            release_old.send(()).unwrap();
        };
        let (old, ()) = tokio::join!(old, abandoned);

        assert_eq!(old, ShippingOutcome::Superseded);
        assert!(!h.flow.is_loading_shipping());
        let CheckoutView::Shipping(view) = h.flow.view() else {
            panic!("expected shipping view");
        };
        assert_eq!(view.calculate_label, "Calculate Shipping");
    }

    #[tokio::test]
    async fn test_view_while_quote_in_flight() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());

        let (release, gate) = oneshot::channel();
        h.rates.push(Scripted::gated(gate, Ok(vec![option("a", 5.0)])));

        let quote = h.flow.calculate_shipping();
        let observe = async {
            let CheckoutView::Shipping(view) = h.flow.view() else {
                panic!("expected shipping view");
            };
            release.send(()).unwrap();
            view
        };
        let (outcome, during) = tokio::join!(quote, observe);

        assert_eq!(during.calculate_label, "Calculating...");
        assert!(during.loading_shipping);
        assert_eq!(outcome, ShippingOutcome::Updated { options: 1 });

        let CheckoutView::Shipping(after) = h.flow.view() else {
            panic!("expected shipping view");
        };
        assert_eq!(after.calculate_label, "Calculate Shipping");
    }

    #[tokio::test]
    async fn test_address_edit_marks_quote_stale() {
        let h = harness(screen_cart());
        quoted(&h).await;
        assert!(!h.flow.is_quote_stale());

        h.flow.update_address(|address| address.zip = "78701".into());

        assert!(h.flow.is_quote_stale());
        assert_eq!(h.flow.selected_shipping(), "a");
    }

    #[tokio::test]
    async fn test_select_shipping() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();
        h.flow.set_address(full_address());
        h.rates
            .push(Scripted::ready(Ok(vec![option("a", 5.0), option("b", 15.0)])));
        h.flow.calculate_shipping().await;

        h.flow.select_shipping("b").unwrap();
        assert_eq!(h.flow.summary().total.as_decimal(), 115.0);

        assert!(matches!(
            h.flow.select_shipping("missing"),
            Err(CheckoutError::UnknownShippingOption { .. })
        ));
        assert_eq!(h.flow.selected_shipping(), "b");
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pay_redirects_to_session_url() {
        let h = harness(screen_cart());
        quoted(&h).await;
        h.sessions
            .push(Scripted::ready(Ok(session_url("https://checkout.stripe.com/c/pay/cs_1"))));

        let outcome = h.flow.pay().await.unwrap();

        assert_eq!(
            outcome,
            PayOutcome::Redirected("https://checkout.stripe.com/c/pay/cs_1".into())
        );
        assert_eq!(
            h.navigator.visits(),
            vec![Navigation::External(
                "https://checkout.stripe.com/c/pay/cs_1".into()
            )]
        );
        assert_eq!(h.payments.loads.load(Ordering::SeqCst), 1);
        assert!(h.flow.is_loading());
        // Cart is left for the order backend by default
        assert_eq!(h.cart.items().len(), 1);
    }

    #[tokio::test]
    async fn test_pay_sends_price_refs_not_totals() {
        let h = harness(vec![
            CartItem::new("screen", "Screen", 50.0, 2, "price_screen"),
            CartItem::new("battery", "Battery", 19.99, 1, "price_battery"),
        ]);
        quoted(&h).await;
        h.sessions.push(Scripted::ready(Ok(session_url("https://pay.example/cs"))));

        h.flow.pay().await.unwrap();

        let request = h.sessions.requests.lock().unwrap()[0].clone();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "items": [
                    { "priceId": "price_screen", "quantity": 2 },
                    { "priceId": "price_battery", "quantity": 1 }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_pay_without_url_alerts_once() {
        let h = harness(screen_cart());
        quoted(&h).await;
        h.sessions
            .push(Scripted::ready(Ok(CheckoutSessionResponse::default())));

        let outcome = h.flow.pay().await.unwrap();

        assert_eq!(outcome, PayOutcome::SessionFailed);
        assert_eq!(
            *h.notifier.alerts.lock().unwrap(),
            vec!["Failed to create checkout session".to_string()]
        );
        assert!(!h.flow.is_loading());
        assert_eq!(h.flow.view().pay_button().map(|b| b.disabled), Some(false));
        assert!(h.navigator.visits().is_empty());
    }

    #[tokio::test]
    async fn test_pay_empty_url_is_failure() {
        let h = harness(screen_cart());
        quoted(&h).await;
        h.sessions.push(Scripted::ready(Ok(session_url(""))));

        assert_eq!(h.flow.pay().await.unwrap(), PayOutcome::SessionFailed);
    }

    #[tokio::test]
    async fn test_pay_transport_error_resets_loading() {
        let h = harness(screen_cart());
        quoted(&h).await;
        h.sessions.push(Scripted::ready(Err("timed out".into())));

        let err = h.flow.pay().await.unwrap_err();

        assert!(matches!(err, CheckoutError::NetworkError(_)));
        assert!(!h.flow.is_loading());
        assert!(h.notifier.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_pay_sends_one_request() {
        let h = harness(screen_cart());
        quoted(&h).await;

        let (release, gate) = oneshot::channel();
        h.sessions
            .push(Scripted::gated(gate, Ok(session_url("https://pay.example/cs"))));

        let first = h.flow.pay();
        let second = async {
            let outcome = h.flow.pay().await;
            release.send(()).unwrap();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(
            first.unwrap(),
            PayOutcome::Redirected("https://pay.example/cs".into())
        );
        assert_eq!(second.unwrap(), PayOutcome::AlreadyInFlight);
        assert_eq!(h.sessions.calls(), 1);
    }

    #[tokio::test]
    async fn test_pay_button_disabled_while_paying() {
        let h = harness(screen_cart());
        quoted(&h).await;

        let (release, gate) = oneshot::channel();
        h.sessions
            .push(Scripted::gated(gate, Ok(CheckoutSessionResponse::default())));

        let pay = h.flow.pay();
        let observe = async {
            let button = h.flow.view().pay_button();
            release.send(()).unwrap();
            button
        };
        let (outcome, during) = tokio::join!(pay, observe);

        assert_eq!(
            during,
            Some(PayButton {
                label: "Pay with Stripe",
                disabled: true
            })
        );
        assert_eq!(outcome.unwrap(), PayOutcome::SessionFailed);
        assert_eq!(h.flow.view().pay_button().map(|b| b.disabled), Some(false));
    }

    #[tokio::test]
    async fn test_pay_requires_selection() {
        let h = harness(screen_cart());
        h.flow.continue_to_shipping().unwrap();

        let err = h.flow.pay().await.unwrap_err();

        assert!(matches!(err, CheckoutError::InvalidRequest(_)));
        assert_eq!(h.sessions.calls(), 0);
        assert!(!h.flow.is_loading());
    }

    #[tokio::test]
    async fn test_pay_from_cart_step_rejected() {
        let h = harness(screen_cart());

        assert!(matches!(
            h.flow.pay().await,
            Err(CheckoutError::InvalidStepTransition { .. })
        ));
        assert_eq!(h.payments.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_cart_before_redirect() {
        let h = harness_with(
            screen_cart(),
            FlowConfig::default().with_clear_cart(CartClearPolicy::BeforeRedirect),
        );
        let watcher = h.flow.watch_cart();
        quoted(&h).await;
        h.sessions.push(Scripted::ready(Ok(session_url("https://pay.example/cs"))));

        h.flow.pay().await.unwrap();

        assert!(h.cart.items().is_empty());
        watcher.abort();
        // The guard stays quiet once the redirect is under way
        assert!(!h.flow.enforce_cart_guard());
        assert_eq!(
            h.navigator.visits(),
            vec![Navigation::External("https://pay.example/cs".into())]
        );
    }

    #[test]
    fn test_clear_policy_parse() {
        assert_eq!(
            CartClearPolicy::parse("TRUE"),
            Some(CartClearPolicy::BeforeRedirect)
        );
        assert_eq!(CartClearPolicy::parse("never"), Some(CartClearPolicy::Never));
        assert_eq!(CartClearPolicy::parse("sometimes"), None);
    }
}
