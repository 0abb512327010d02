//! Ingress service (C6) - routes an inbound provider event to a tenant

use std::sync::Arc;

use domain::{ConversationId, MessageKind, StartedBy, TenantId, to_digits, to_e164};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{ConversationStorePort, IntegrationStorePort, MessageStorePort};

/// One parsed inbound message, already extracted from the provider's
/// nested or flat webhook shape (done by the integration_whatsapp crate).
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Raw `from` field as the provider sent it
    pub from_raw: String,
    /// Provider-assigned message id, if present
    pub provider_msg_id: Option<String>,
    /// Provider-supplied timestamp, used to fabricate an id when
    /// `provider_msg_id` is absent
    pub provider_timestamp: String,
    /// Message kind
    pub kind: MessageKind,
    /// Rendered text (placeholder for non-text kinds)
    pub text: String,
    /// The original provider payload, preserved for audit
    pub payload: Value,
}

/// Outcome of routing one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub tenant_id: TenantId,
    pub conversation_id: ConversationId,
    pub message_was_new: bool,
}

/// Routes inbound webhook events to the owning integration and stores them
/// under the at-most-once rule. Enqueuing the resulting `EvaluateTenant` job
/// is the caller's (presentation_http handler's) responsibility so that
/// Ingress itself stays free of queue concerns.
pub struct IngressService {
    integrations: Arc<dyn IntegrationStorePort>,
    conversations: Arc<dyn ConversationStorePort>,
    messages: Arc<dyn MessageStorePort>,
}

impl IngressService {
    pub fn new(
        integrations: Arc<dyn IntegrationStorePort>,
        conversations: Arc<dyn ConversationStorePort>,
        messages: Arc<dyn MessageStorePort>,
    ) -> Self {
        Self {
            integrations,
            conversations,
            messages,
        }
    }

    /// Handle one inbound event. Returns `Ok(None)` (not an error) when no
    /// integration routes to the sender, matching the "drop, logged" policy
    /// from the ingress contract — a routing miss is not a processing
    /// failure the webhook handler needs to treat specially.
    #[instrument(skip(self, event), fields(from = %event.from_raw))]
    pub async fn handle_message(&self, event: InboundEvent) -> Result<Option<IngestOutcome>, ApplicationError> {
        let Some(e164) = to_e164(&event.from_raw) else {
            warn!("inbound event has no extractable digits, dropping");
            return Ok(None);
        };
        let digits = to_digits(&event.from_raw).unwrap_or_default();

        let variants = vec![e164.clone(), digits, event.from_raw.clone()];
        let Some(integration) = self.integrations.find_by_tester(&variants).await? else {
            debug!(%e164, "no integration routes to this number");
            return Ok(None);
        };

        let (conversation, _created) = self
            .conversations
            .open_or_create(integration.id, &e164, StartedBy::Contact)
            .await?;

        let provider_msg_id = event.provider_msg_id.clone().unwrap_or_else(|| {
            format!("in_{e164}_{}", event.provider_timestamp)
        });
        let (_message, is_new) = self
            .messages
            .append_inbound(
                integration.id,
                conversation.id,
                &e164,
                &provider_msg_id,
                event.kind,
                &event.text,
                event.payload,
            )
            .await?;

        self.conversations.touch(conversation.id, chrono::Utc::now()).await?;

        Ok(Some(IngestOutcome {
            tenant_id: integration.tenant_id,
            conversation_id: conversation.id,
            message_was_new: is_new,
        }))
    }
}
