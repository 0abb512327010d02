//! WhatsApp client - 360dialog-style Business API adapter
//!
//! Implements [`application::WhatsAppGatewayPort`] against a provider base
//! URL that authenticates every request with a single `<provider-key>`
//! header rather than OAuth, matching the sandbox/D360 contract.

use std::time::Duration;

use application::{ApplicationError, SentMessage, TemplateComponents, WhatsAppGatewayPort};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT_SECS: u64 = 18;
const PROVIDER_KEY_HEADER: &str = "D360-API-KEY";

/// Outbound WhatsApp provider adapter
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: Client,
    base_url: String,
}

impl WhatsAppClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn map_status_error(response: reqwest::Response) -> ApplicationError {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ApplicationError::Auth("provider rejected the API key".to_string());
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return ApplicationError::Permission("provider denied the request".to_string());
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return ApplicationError::Endpoint("provider endpoint not found".to_string());
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, %body, "provider returned an unmapped error status");
        ApplicationError::Http(status.as_u16())
    }

    async fn send(&self, key: &str, payload: &SendRequest) -> Result<SentMessage, ApplicationError> {
        let response = self
            .client
            .post(self.url("/v1/messages"))
            .header(PROVIDER_KEY_HEADER, key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ApplicationError::Internal(format!("request to provider failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::map_status_error(response).await);
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ApplicationError::Internal(format!("non-JSON provider response: {e}")))?;

        let provider_msg_id = raw
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.first())
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(SentMessage { provider_msg_id, raw })
    }
}

#[async_trait]
impl WhatsAppGatewayPort for WhatsAppClient {
    #[instrument(skip(self, key, url))]
    async fn register_webhook(&self, key: &str, url: &str) -> Result<(), ApplicationError> {
        let response = self
            .client
            .post(self.url("/v1/configs/webhook"))
            .header(PROVIDER_KEY_HEADER, key)
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| ApplicationError::Internal(format!("request to provider failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::map_status_error(response).await)
        }
    }

    #[instrument(skip(self, key, body))]
    async fn send_text(&self, key: &str, to_digits: &str, body: &str) -> Result<SentMessage, ApplicationError> {
        let payload = SendRequest {
            messaging_product: "whatsapp",
            to: to_digits.to_string(),
            msg_type: "text",
            text: Some(TextBody { body: body.to_string() }),
            template: None,
        };
        self.send(key, &payload).await
    }

    #[instrument(skip(self, key, components))]
    async fn send_template(
        &self,
        key: &str,
        to_digits: &str,
        template_name: &str,
        components: TemplateComponents,
        lang: &str,
    ) -> Result<SentMessage, ApplicationError> {
        let payload = SendRequest {
            messaging_product: "whatsapp",
            to: to_digits.to_string(),
            msg_type: "template",
            text: None,
            template: Some(TemplateBody {
                name: template_name.to_string(),
                language: TemplateLanguage { code: lang.to_string() },
                components,
            }),
        };
        self.send(key, &payload).await
    }
}

#[derive(Debug, Serialize)]
struct SendRequest {
    messaging_product: &'static str,
    to: String,
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<TemplateBody>,
}

#[derive(Debug, Serialize)]
struct TextBody {
    body: String,
}

#[derive(Debug, Serialize)]
struct TemplateBody {
    name: String,
    language: TemplateLanguage,
    components: Value,
}

#[derive(Debug, Serialize)]
struct TemplateLanguage {
    code: String,
}
