//! WhatsAppGateway port - outbound send and webhook registration

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::error::ApplicationError;

/// The result of a successful send
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// The provider's message id, when the response included one
    pub provider_msg_id: Option<String>,
    /// The raw provider response, preserved for audit
    pub raw: Value,
}

/// A template component payload, passed through to the provider verbatim
pub type TemplateComponents = Value;

/// Port for the outbound WhatsApp business provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WhatsAppGatewayPort: Send + Sync {
    /// Register the webhook URL the provider should deliver inbound events to
    async fn register_webhook(&self, key: &str, url: &str) -> Result<(), ApplicationError>;

    /// Send a free-form text message
    async fn send_text(
        &self,
        key: &str,
        to_digits: &str,
        body: &str,
    ) -> Result<SentMessage, ApplicationError>;

    /// Send a pre-approved template message
    async fn send_template(
        &self,
        key: &str,
        to_digits: &str,
        template_name: &str,
        components: TemplateComponents,
        lang: &str,
    ) -> Result<SentMessage, ApplicationError>;
}
