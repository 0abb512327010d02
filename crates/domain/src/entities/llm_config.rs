//! LLMConfig entity - per-tenant language model configuration

use serde::{Deserialize, Serialize};

use crate::value_objects::TenantId;

/// Which model tier a tenant is configured to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmModel {
    /// Cheaper, lower-latency model for routine classify/chat calls
    Fast,
    /// Higher-quality model for cases that warrant it
    Accurate,
    /// Larger context window for long conversation histories
    Extended,
}

impl std::fmt::Display for LlmModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Fast => "fast",
            Self::Accurate => "accurate",
            Self::Extended => "extended",
        };
        write!(f, "{s}")
    }
}

/// A tenant's LLM configuration. One per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Sealed LLM API key (ciphertext)
    pub api_key_sealed: Vec<u8>,
    /// Which model tier to use
    pub model: LlmModel,
    /// Sampling temperature, clamped to `[0, 1]`
    pub temperature: f32,
    /// Maximum generated tokens, clamped to `[1, 4000]`
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Construct a config, clamping temperature and max_tokens into their
    /// valid ranges rather than rejecting out-of-range input — operator
    /// input that is merely aggressive (e.g. `temperature: 5.0`) should
    /// still produce a usable configuration.
    pub fn new(
        tenant_id: TenantId,
        api_key_sealed: Vec<u8>,
        model: LlmModel,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            tenant_id,
            api_key_sealed,
            model,
            temperature: temperature.clamp(0.0, 1.0),
            max_tokens: max_tokens.clamp(1, 4000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_is_clamped_to_unit_interval() {
        let cfg = LlmConfig::new(TenantId::new(), vec![], LlmModel::Fast, 5.0, 300);
        assert_eq!(cfg.temperature, 1.0);

        let cfg = LlmConfig::new(TenantId::new(), vec![], LlmModel::Fast, -1.0, 300);
        assert_eq!(cfg.temperature, 0.0);
    }

    #[test]
    fn max_tokens_is_clamped_into_range() {
        let cfg = LlmConfig::new(TenantId::new(), vec![], LlmModel::Fast, 0.5, 0);
        assert_eq!(cfg.max_tokens, 1);

        let cfg = LlmConfig::new(TenantId::new(), vec![], LlmModel::Fast, 0.5, 10_000);
        assert_eq!(cfg.max_tokens, 4000);
    }

    #[test]
    fn model_displays_lowercase() {
        assert_eq!(LlmModel::Extended.to_string(), "extended");
    }
}
