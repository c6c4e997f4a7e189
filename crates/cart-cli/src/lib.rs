//! # cart-cli
//!
//! Terminal driver for the parts checkout flow.

pub mod commands;
pub mod terminal;
