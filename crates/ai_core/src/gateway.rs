//! LLMGateway adapter - OpenAI-compatible chat completion and typed classification
//!
//! Implements [`application::LlmGatewayPort`] against any OpenAI-compatible
//! `/v1/chat/completions` endpoint. `classify` asks the model for a JSON
//! object matching [`Evaluation`]'s shape and degrades to
//! `Evaluation::safe_default` on any network failure or malformed output -
//! `classify` itself never returns `Err` for a parse failure.

use std::sync::Arc;
use std::time::Duration;

use application::{ApplicationError, Evaluation, EvaluationStatus, LlmGatewayPort, SecretBoxPort};
use async_trait::async_trait;
use domain::{LlmConfig, LlmModel};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

const CLASSIFY_INSTRUCTIONS: &str = "You are an expert conversation analyst specializing in \
client engagement evaluation for sales and business development. Reply with a single JSON object \
and nothing else, matching this shape exactly: {\"status\": \"continue\"|\"schedule_later\"|\"close\", \
\"confidence\": number between 0 and 1, \"reasoning\": string, \"client_sentiment\": string, \
\"engagement_level\": string, \"suggested_timing\": string or null}. Be conservative: prefer \
\"continue\" unless the client clearly asked to be contacted later or clearly disengaged.";

fn model_name(model: LlmModel) -> &'static str {
    match model {
        LlmModel::Fast => "gpt-4o-mini",
        LlmModel::Accurate => "gpt-4o",
        LlmModel::Extended => "gpt-4.1",
    }
}

/// Chat-completion adapter backed by an OpenAI-compatible HTTP API
pub struct LlmGateway {
    client: Client,
    base_url: String,
    secret_box: Arc<dyn SecretBoxPort>,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl LlmGateway {
    pub fn new(base_url: impl Into<String>, secret_box: Arc<dyn SecretBoxPort>) -> Result<Self, ApplicationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            secret_box,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn complete(
        &self,
        config: &LlmConfig,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        json_mode: bool,
    ) -> Result<String, ApplicationError> {
        let api_key = self.secret_box.open(&config.api_key_sealed).await?;

        let request = ChatRequest {
            model: model_name(config.model).to_string(),
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: user.to_string() },
            ],
            temperature: temperature.unwrap_or(config.temperature),
            max_tokens: max_tokens.unwrap_or(config.max_tokens),
            response_format: json_mode.then(|| ResponseFormat { kind: "json_object".to_string() }),
        };

        debug!(model = %request.model, "sending chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApplicationError::Llm(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApplicationError::Auth("LLM provider rejected the API key".to_string()));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApplicationError::Permission("LLM provider denied the request".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApplicationError::Llm(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApplicationError::Llm(format!("invalid response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ApplicationError::Llm("empty choices array".to_string()))
    }
}

#[async_trait]
impl LlmGatewayPort for LlmGateway {
    #[instrument(skip(self, config, system, user))]
    async fn chat(
        &self,
        config: &LlmConfig,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, ApplicationError> {
        self.complete(config, system, user, temperature, max_tokens, false).await
    }

    #[instrument(skip(self, config, summary, context))]
    async fn classify(
        &self,
        config: &LlmConfig,
        summary: &str,
        context: &str,
    ) -> Result<Evaluation, ApplicationError> {
        let user_prompt = format!(
            "CONVERSATION SUMMARY:\n{summary}\n\nRECENT MESSAGES:\n{context}"
        );

        let raw = match self
            .complete(config, CLASSIFY_INSTRUCTIONS, &user_prompt, Some(0.2), Some(500), true)
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "classification request failed, using safe default");
                return Ok(Evaluation::safe_default(err.to_string()));
            }
        };

        match serde_json::from_str::<ClassifyPayload>(&raw) {
            Ok(payload) => Ok(payload.into()),
            Err(err) => {
                warn!(%err, raw = %raw, "classification output did not parse, using safe default");
                Ok(Evaluation::safe_default(format!("malformed model output: {err}")))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClassifyPayload {
    status: String,
    confidence: f32,
    reasoning: String,
    client_sentiment: String,
    engagement_level: String,
    suggested_timing: Option<String>,
}

impl From<ClassifyPayload> for Evaluation {
    fn from(payload: ClassifyPayload) -> Self {
        let status = match payload.status.as_str() {
            "schedule_later" => EvaluationStatus::ScheduleLater,
            "close" => EvaluationStatus::Close,
            _ => EvaluationStatus::Continue,
        };
        Self {
            status,
            confidence: payload.confidence.clamp(0.0, 1.0),
            reasoning: payload.reasoning,
            client_sentiment: payload.client_sentiment,
            engagement_level: payload.engagement_level,
            suggested_timing: payload.suggested_timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::NoOpSecretBox;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_config(tenant_id: domain::TenantId) -> LlmConfig {
        LlmConfig::new(tenant_id, b"test-key".to_vec(), LlmModel::Fast, 0.3, 300)
    }

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "hello there"}}]
            })))
            .mount(&server)
            .await;

        let gateway = LlmGateway::new(server.uri(), Arc::new(NoOpSecretBox)).unwrap();
        let config = sample_config(domain::TenantId::new());
        let reply = gateway.chat(&config, "system", "user", None, None).await.unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn classify_parses_well_formed_json() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "status": "schedule_later",
            "confidence": 0.8,
            "reasoning": "asked for next month",
            "client_sentiment": "positive",
            "engagement_level": "medium",
            "suggested_timing": "next month"
        })
        .to_string();
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": body}}]
            })))
            .mount(&server)
            .await;

        let gateway = LlmGateway::new(server.uri(), Arc::new(NoOpSecretBox)).unwrap();
        let config = sample_config(domain::TenantId::new());
        let eval = gateway.classify(&config, "summary", "context").await.unwrap();
        assert_eq!(eval.status, EvaluationStatus::ScheduleLater);
        assert_eq!(eval.suggested_timing.as_deref(), Some("next month"));
    }

    #[tokio::test]
    async fn classify_degrades_to_safe_default_on_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "not json at all"}}]
            })))
            .mount(&server)
            .await;

        let gateway = LlmGateway::new(server.uri(), Arc::new(NoOpSecretBox)).unwrap();
        let config = sample_config(domain::TenantId::new());
        let eval = gateway.classify(&config, "summary", "context").await.unwrap();
        assert_eq!(eval.status, EvaluationStatus::Continue);
        assert_eq!(eval.confidence, 0.5);
    }

    #[tokio::test]
    async fn classify_degrades_to_safe_default_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = LlmGateway::new(server.uri(), Arc::new(NoOpSecretBox)).unwrap();
        let config = sample_config(domain::TenantId::new());
        let eval = gateway.classify(&config, "summary", "context").await.unwrap();
        assert_eq!(eval.status, EvaluationStatus::Continue);
    }

    #[tokio::test]
    async fn chat_maps_401_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let gateway = LlmGateway::new(server.uri(), Arc::new(NoOpSecretBox)).unwrap();
        let config = sample_config(domain::TenantId::new());
        let err = gateway.chat(&config, "s", "u", None, None).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Auth(_)));
    }
}
