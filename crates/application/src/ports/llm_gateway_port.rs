//! LLMGateway port - chat completion and typed conversation classification

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::LlmConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApplicationError;

/// Conversation health as classified by `classify`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    Continue,
    ScheduleLater,
    Close,
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Continue => "continue",
            Self::ScheduleLater => "schedule_later",
            Self::Close => "close",
        };
        write!(f, "{s}")
    }
}

/// The typed output of `classify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: EvaluationStatus,
    pub confidence: f32,
    pub reasoning: String,
    pub client_sentiment: String,
    pub engagement_level: String,
    pub suggested_timing: Option<String>,
}

impl Evaluation {
    /// The safe default returned when classification fails or the model's
    /// output cannot be parsed into this shape. Callers must never see the
    /// underlying parse/LLM error for this call — degrading silently is the
    /// contract.
    pub fn safe_default(reason: impl Into<String>) -> Self {
        Self {
            status: EvaluationStatus::Continue,
            confidence: 0.5,
            reasoning: format!("Evaluation failed: {}", reason.into()),
            client_sentiment: "unknown".to_string(),
            engagement_level: "unknown".to_string(),
            suggested_timing: None,
        }
    }
}

/// Port for the LLM boundary: free-form chat and typed classification
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LlmGatewayPort: Send + Sync {
    /// A single chat-completion call
    async fn chat(
        &self,
        config: &LlmConfig,
        system: &str,
        user: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, ApplicationError>;

    /// Classify a conversation from its summary and recent context into a
    /// typed [`Evaluation`]. Implementations must catch malformed output and
    /// return `Ok(Evaluation::safe_default(..))` rather than an error.
    async fn classify(
        &self,
        config: &LlmConfig,
        summary: &str,
        context: &str,
    ) -> Result<Evaluation, ApplicationError>;
}
