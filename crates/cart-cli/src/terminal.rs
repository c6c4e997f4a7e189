//! Terminal front end: stdout navigation, stderr alerts and a plain-text
//! rendering of the checkout views.

use cart_core::{CheckoutView, Navigation, Navigator, Notifier};
use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

/// Prints where the flow would send the browser
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl TerminalNavigator {
    pub fn history(&self) -> Vec<Navigation> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.history().pop()
    }
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, to: Navigation) {
        match &to {
            Navigation::Route(path) => println!("→ {}", path),
            Navigation::External(url) => println!("→ Redirecting to {}", url),
        }
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to);
    }
}

/// Alerts go to stderr
#[derive(Debug, Default)]
pub struct TerminalNotifier {
    alerts: Mutex<Vec<String>>,
}

impl TerminalNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("⚠ {}", message);
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Plain-text rendering of a checkout view
pub fn render(view: &CheckoutView) -> String {
    let mut out = String::new();

    match view {
        CheckoutView::Cart(cart) => {
            out.push_str("Cart\n━━━━\n");
            for line in &cart.lines {
                let _ = writeln!(
                    out,
                    "  {} × {} @ {} = {}",
                    line.quantity, line.title, line.unit_price, line.line_total
                );
            }
            let _ = writeln!(out, "Subtotal: {}", cart.subtotal);
            let _ = writeln!(out, "[{}]", cart.continue_label);
        }
        CheckoutView::Shipping(shipping) => {
            out.push_str("Shipping\n━━━━━━━━\n");
            let _ = writeln!(out, "Ship to: {}", shipping.address.one_line());
            let _ = writeln!(out, "[{}]", shipping.calculate_label);

            if !shipping.options.is_empty() {
                out.push_str("Options:\n");
                for option in &shipping.options {
                    let marker = if option.selected { "(•)" } else { "( )" };
                    let _ = writeln!(out, "  {} {} [{}]", marker, option.label, option.option.id);
                }
            }

            let _ = writeln!(out, "Subtotal: {}", shipping.summary.subtotal);
            let _ = writeln!(out, "Shipping: {}", shipping.summary.shipping);
            let _ = writeln!(out, "Total:    {}", shipping.summary.total);

            if let Some(button) = shipping.pay_button {
                let state = if button.disabled { " (disabled)" } else { "" };
                let _ = writeln!(out, "[{}]{}", button.label, state);
            }
        }
    }

    out
}
