//! HTTP request handlers

pub mod conversations;
pub mod health;
pub mod ingress;
pub mod integrations;
pub mod messages;
