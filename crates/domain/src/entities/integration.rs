//! Integration entity - a tenant's connection to a WhatsApp provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{IntegrationId, TenantId};

/// Which environment an integration talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMode {
    /// Sandbox/test provider account
    Sandbox,
    /// Production provider account
    Prod,
}

impl std::fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Prod => write!(f, "prod"),
        }
    }
}

/// A tenant's WhatsApp provider integration.
///
/// `provider_key_sealed` is ciphertext produced by `SecretBox::seal` — the
/// entity never carries a plaintext key once constructed via [`Integration::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    /// Unique integration identifier
    pub id: IntegrationId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Sandbox or production
    pub mode: IntegrationMode,
    /// Sealed provider API key (ciphertext)
    pub provider_key_sealed: Vec<u8>,
    /// MSISDN used to route inbound webhook events to this integration
    pub tester_msisdn: String,
    /// Free-text context about the client, fed into prompts
    pub client_context: String,
    /// Free-text context about the project, fed into prompts
    pub project_context: String,
    /// Free-text custom instructions, fed into prompts
    pub custom_instructions: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Construct an integration from an already-sealed key. Callers that hold
    /// a plaintext key must seal it via `SecretBoxPort::seal` first; this
    /// constructor never accepts plaintext so it cannot be misused to skip
    /// sealing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        mode: IntegrationMode,
        provider_key_sealed: Vec<u8>,
        tester_msisdn: impl Into<String>,
        client_context: impl Into<String>,
        project_context: impl Into<String>,
        custom_instructions: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: IntegrationId::new(),
            tenant_id,
            mode,
            provider_key_sealed,
            tester_msisdn: tester_msisdn.into(),
            client_context: client_context.into(),
            project_context: project_context.into(),
            custom_instructions: custom_instructions.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True if a provider key has ever been sealed into this integration.
    pub fn has_key(&self) -> bool {
        !self.provider_key_sealed.is_empty()
    }

    /// An operator-facing masked preview of the sealed key, derived from the
    /// ciphertext bytes alone. This never requires unsealing and therefore
    /// cannot leak plaintext even if the display path is misused.
    pub fn masked_key_preview(&self) -> String {
        if self.provider_key_sealed.is_empty() {
            return "(none)".to_string();
        }
        let hex = hex_prefix_suffix(&self.provider_key_sealed, 4);
        format!("{}…{}", hex.0, hex.1)
    }
}

fn hex_prefix_suffix(bytes: &[u8], n: usize) -> (String, String) {
    let head: String = bytes.iter().take(n).map(|b| format!("{b:02x}")).collect();
    let tail: String = bytes
        .iter()
        .rev()
        .take(n)
        .rev()
        .map(|b| format!("{b:02x}"))
        .collect();
    (head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Integration {
        Integration::new(
            TenantId::new(),
            IntegrationMode::Sandbox,
            vec![1, 2, 3, 4, 5, 6, 7, 8],
            "+923001234567",
            "client context",
            "project context",
            "custom instructions",
        )
    }

    #[test]
    fn new_integration_has_sealed_key() {
        assert!(sample().has_key());
    }

    #[test]
    fn integration_without_key_reports_no_key() {
        let integration = Integration::new(
            TenantId::new(),
            IntegrationMode::Sandbox,
            Vec::new(),
            "+1",
            "",
            "",
            "",
        );
        assert!(!integration.has_key());
        assert_eq!(integration.masked_key_preview(), "(none)");
    }

    #[test]
    fn masked_key_preview_never_equals_hex_of_full_ciphertext() {
        let integration = sample();
        let full_hex: String = integration
            .provider_key_sealed
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        assert_ne!(integration.masked_key_preview(), full_hex);
    }

    #[test]
    fn mode_displays_lowercase() {
        assert_eq!(IntegrationMode::Sandbox.to_string(), "sandbox");
        assert_eq!(IntegrationMode::Prod.to_string(), "prod");
    }
}
