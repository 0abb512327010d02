//! ReplyGenerator service (C9) - context-aware reply with an anti-loop guard

use std::sync::Arc;

use domain::{ConversationId, ConversationStatus, Direction, Integration, MessageKind};
use tracing::{info, instrument};

use crate::error::ApplicationError;
use crate::ports::{
    ConversationStorePort, IntegrationStorePort, LlmGatewayPort, MessageStorePort, SecretBoxPort,
    SummaryStorePort, TenantStorePort, WhatsAppGatewayPort,
};

const REPLY_TAIL: u32 = 5;
const REPLY_TEMPERATURE: f32 = 0.7;
const REPLY_MAX_TOKENS: u32 = 300;

/// Outcome of a reply attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Sent { message_id: String },
    Skipped { reason: &'static str },
}

/// Generates and sends a reply on a conversation, guarded so that only one
/// concurrent reply job ever sends.
pub struct ReplyGeneratorService {
    conversations: Arc<dyn ConversationStorePort>,
    messages: Arc<dyn MessageStorePort>,
    summaries: Arc<dyn SummaryStorePort>,
    integrations: Arc<dyn IntegrationStorePort>,
    tenants: Arc<dyn TenantStorePort>,
    llm: Arc<dyn LlmGatewayPort>,
    whatsapp: Arc<dyn WhatsAppGatewayPort>,
    secret_box: Arc<dyn SecretBoxPort>,
}

impl ReplyGeneratorService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversations: Arc<dyn ConversationStorePort>,
        messages: Arc<dyn MessageStorePort>,
        summaries: Arc<dyn SummaryStorePort>,
        integrations: Arc<dyn IntegrationStorePort>,
        tenants: Arc<dyn TenantStorePort>,
        llm: Arc<dyn LlmGatewayPort>,
        whatsapp: Arc<dyn WhatsAppGatewayPort>,
        secret_box: Arc<dyn SecretBoxPort>,
    ) -> Self {
        Self {
            conversations,
            messages,
            summaries,
            integrations,
            tenants,
            llm,
            whatsapp,
            secret_box,
        }
    }

    #[instrument(skip(self))]
    pub async fn maybe_reply(&self, conversation_id: ConversationId) -> Result<ReplyOutcome, ApplicationError> {
        let Some(conversation) = self.conversations.get(conversation_id).await? else {
            return Ok(ReplyOutcome::Skipped { reason: "conversation not found" });
        };
        if conversation.status != ConversationStatus::Continue {
            return Ok(ReplyOutcome::Skipped { reason: "conversation not in CONTINUE" });
        }
        let Some(last) = self.messages.last(conversation_id).await? else {
            return Ok(ReplyOutcome::Skipped { reason: "no messages yet" });
        };
        if last.direction != Direction::In {
            return Ok(ReplyOutcome::Skipped { reason: "last message is outbound" });
        }

        let Some(integration) = self.integrations.get(conversation.integration_id).await? else {
            return Ok(ReplyOutcome::Skipped { reason: "integration missing" });
        };
        let Some(llm_config) = self.tenants.get_llm_config(integration.tenant_id).await? else {
            return Ok(ReplyOutcome::Skipped { reason: "no LLM config" });
        };

        let tail = self.messages.tail(conversation_id, REPLY_TAIL).await?;
        let transcript: String = tail.iter().map(|m| format!("{}\n", m.transcript_line())).collect();
        let footer = self
            .summaries
            .get(conversation_id)
            .await?
            .map(|s| s.content)
            .unwrap_or_default();
        let system_prompt = build_system_prompt(&integration, &footer);

        let reply_text = self
            .llm
            .chat(
                &llm_config,
                &system_prompt,
                &transcript,
                Some(REPLY_TEMPERATURE),
                Some(REPLY_MAX_TOKENS),
            )
            .await?;

        // Anti-loop recheck: a concurrent reply job may have already sent
        // while this call was in flight on the LLM.
        let Some(recheck) = self.messages.last(conversation_id).await? else {
            return Ok(ReplyOutcome::Skipped { reason: "no messages yet" });
        };
        if recheck.direction != Direction::In {
            info!(%conversation_id, "another worker already replied, skipping");
            return Ok(ReplyOutcome::Skipped { reason: "raced: already replied" });
        }

        let key = self.secret_box.open(&integration.provider_key_sealed).await?;
        let to_digits = domain::to_digits(&conversation.wa_id).unwrap_or_default();
        let sent = self.whatsapp.send_text(&key, &to_digits, &reply_text).await?;

        let provider_msg_id = sent
            .provider_msg_id
            .unwrap_or_else(|| domain::MessageId::fabricate("ai_reply").to_string());
        self.messages
            .append_outbound(
                integration.id,
                conversation_id,
                &conversation.wa_id,
                &provider_msg_id,
                MessageKind::Text,
                &reply_text,
                sent.raw,
            )
            .await?;

        Ok(ReplyOutcome::Sent { message_id: provider_msg_id })
    }
}

fn build_system_prompt(integration: &Integration, summary_footer: &str) -> String {
    format!(
        "You are a sales engineer continuing a WhatsApp conversation.\nClient context: {}\nProject context: {}\nInstructions: {}\nConversation summary so far:\n{}",
        integration.client_context, integration.project_context, integration.custom_instructions, summary_footer
    )
}
