#![forbid(unsafe_code)]
//! WhatsApp integration
//!
//! Outbound sending and webhook registration against a 360dialog-style
//! Business API, and parsing of inbound webhook deliveries in either shape
//! the provider may use.

pub mod client;
pub mod webhook;

pub use client::WhatsAppClient;
pub use webhook::{ParsedMessage, parse_inbound};
