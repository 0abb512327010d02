//! Dispatcher service (C11) - periodic outreach for disengaged conversations

use std::sync::Arc;

use domain::{MessageKind, TenantId};
use tracing::{info, instrument};

use crate::error::ApplicationError;
use crate::ports::{
    ConversationStorePort, IntegrationStorePort, LlmGatewayPort, MessageStorePort, SecretBoxPort,
    SummaryStorePort, TenantStorePort, WhatsAppGatewayPort,
};

const OUTREACH_TEMPERATURE: f32 = 0.7;
const OUTREACH_MAX_TOKENS: u32 = 200;

const OUTREACH_SYSTEM_PROMPT: &str = "You are a sales engineer sending a brief, friendly check-in \
message to a prospect who has gone quiet. Keep it short and low-pressure; do not repeat earlier \
messages verbatim.";

/// Outcome counters for one `dispatch_tenant` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchCounts {
    pub sent: u32,
    pub skipped: u32,
}

/// Sends a periodic outreach line to the most recently touched
/// dispatch-eligible conversation of each of a tenant's integrations.
pub struct DispatcherService {
    tenants: Arc<dyn TenantStorePort>,
    integrations: Arc<dyn IntegrationStorePort>,
    conversations: Arc<dyn ConversationStorePort>,
    messages: Arc<dyn MessageStorePort>,
    summaries: Arc<dyn SummaryStorePort>,
    llm: Arc<dyn LlmGatewayPort>,
    whatsapp: Arc<dyn WhatsAppGatewayPort>,
    secret_box: Arc<dyn SecretBoxPort>,
}

impl DispatcherService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantStorePort>,
        integrations: Arc<dyn IntegrationStorePort>,
        conversations: Arc<dyn ConversationStorePort>,
        messages: Arc<dyn MessageStorePort>,
        summaries: Arc<dyn SummaryStorePort>,
        llm: Arc<dyn LlmGatewayPort>,
        whatsapp: Arc<dyn WhatsAppGatewayPort>,
        secret_box: Arc<dyn SecretBoxPort>,
    ) -> Self {
        Self {
            tenants,
            integrations,
            conversations,
            messages,
            summaries,
            llm,
            whatsapp,
            secret_box,
        }
    }

    #[instrument(skip(self))]
    pub async fn dispatch_tenant(&self, tenant_id: TenantId) -> Result<DispatchCounts, ApplicationError> {
        let mut counts = DispatchCounts::default();

        let Some(llm_config) = self.tenants.get_llm_config(tenant_id).await? else {
            info!(%tenant_id, "tenant has no LLM config, skipping dispatch");
            return Ok(counts);
        };

        for integration in self.integrations.list_for_tenant(tenant_id).await? {
            let Some(conversation) = self
                .conversations
                .most_recent_dispatch_eligible(integration.id)
                .await?
            else {
                counts.skipped += 1;
                continue;
            };

            let summary_text = self
                .summaries
                .get(conversation.id)
                .await?
                .map(|s| s.content)
                .unwrap_or_default();
            let user_prompt = format!(
                "Client context: {}\nConversation summary:\n{}",
                integration.client_context, summary_text
            );

            let outreach_text = self
                .llm
                .chat(
                    &llm_config,
                    OUTREACH_SYSTEM_PROMPT,
                    &user_prompt,
                    Some(OUTREACH_TEMPERATURE),
                    Some(OUTREACH_MAX_TOKENS),
                )
                .await?;

            let key = match self.secret_box.open(&integration.provider_key_sealed).await {
                Ok(key) => key,
                Err(err) if err.is_crypto_failure() => {
                    info!(integration_id = %integration.id, "integration key cannot be opened, skipping as if unkeyed");
                    counts.skipped += 1;
                    continue;
                },
                Err(err) => return Err(err),
            };
            let to_digits = domain::to_digits(&conversation.wa_id).unwrap_or_default();
            let sent = self.whatsapp.send_text(&key, &to_digits, &outreach_text).await?;

            let provider_msg_id = sent
                .provider_msg_id
                .unwrap_or_else(|| domain::MessageId::fabricate("periodic").to_string());
            self.messages
                .append_outbound(
                    integration.id,
                    conversation.id,
                    &conversation.wa_id,
                    &provider_msg_id,
                    MessageKind::Text,
                    &outreach_text,
                    sent.raw,
                )
                .await?;

            counts.sent += 1;
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{
        MockConversationStorePort, MockIntegrationStorePort, MockLlmGatewayPort, MockMessageStorePort,
        MockSecretBoxPort, MockSummaryStorePort, MockTenantStorePort, MockWhatsAppGatewayPort,
    };
    use domain::LlmModel;

    #[tokio::test]
    async fn tenant_without_llm_config_is_skipped() {
        let tenant_id = TenantId::new();
        let mut tenants = MockTenantStorePort::new();
        tenants.expect_get_llm_config().returning(|_| Ok(None));

        let service = DispatcherService::new(
            Arc::new(tenants),
            Arc::new(MockIntegrationStorePort::new()),
            Arc::new(MockConversationStorePort::new()),
            Arc::new(MockMessageStorePort::new()),
            Arc::new(MockSummaryStorePort::new()),
            Arc::new(MockLlmGatewayPort::new()),
            Arc::new(MockWhatsAppGatewayPort::new()),
            Arc::new(MockSecretBoxPort::new()),
        );

        let counts = service.dispatch_tenant(tenant_id).await.unwrap();
        assert_eq!(counts, DispatchCounts::default());
    }

    #[tokio::test]
    async fn integration_with_no_eligible_conversation_is_skipped() {
        let tenant_id = TenantId::new();
        let mut tenants = MockTenantStorePort::new();
        tenants
            .expect_get_llm_config()
            .returning(move |_| Ok(Some(domain::LlmConfig::new(tenant_id, vec![], LlmModel::Fast, 0.5, 200))));

        let integration = domain::Integration::new(
            tenant_id,
            domain::IntegrationMode::Sandbox,
            vec![1],
            "+1",
            "",
            "",
            "",
        );
        let mut integrations = MockIntegrationStorePort::new();
        integrations.expect_list_for_tenant().returning(move |_| Ok(vec![integration.clone()]));

        let mut conversations = MockConversationStorePort::new();
        conversations.expect_most_recent_dispatch_eligible().returning(|_| Ok(None));

        let service = DispatcherService::new(
            Arc::new(tenants),
            Arc::new(integrations),
            Arc::new(conversations),
            Arc::new(MockMessageStorePort::new()),
            Arc::new(MockSummaryStorePort::new()),
            Arc::new(MockLlmGatewayPort::new()),
            Arc::new(MockWhatsAppGatewayPort::new()),
            Arc::new(MockSecretBoxPort::new()),
        );

        let counts = service.dispatch_tenant(tenant_id).await.unwrap();
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.sent, 0);
    }

    #[tokio::test]
    async fn unopenable_key_skips_integration_instead_of_aborting_tenant() {
        let tenant_id = TenantId::new();
        let mut tenants = MockTenantStorePort::new();
        tenants
            .expect_get_llm_config()
            .returning(move |_| Ok(Some(domain::LlmConfig::new(tenant_id, vec![], LlmModel::Fast, 0.5, 200))));

        let integration = domain::Integration::new(
            tenant_id,
            domain::IntegrationMode::Sandbox,
            vec![1],
            "+1",
            "",
            "",
            "",
        );
        let integration_id = integration.id;
        let mut integrations = MockIntegrationStorePort::new();
        integrations.expect_list_for_tenant().returning(move |_| Ok(vec![integration.clone()]));

        let conversation = domain::Conversation::open(integration_id, "+1", domain::StartedBy::Contact);
        let mut conversations = MockConversationStorePort::new();
        conversations
            .expect_most_recent_dispatch_eligible()
            .returning(move |_| Ok(Some(conversation.clone())));

        let mut summaries = MockSummaryStorePort::new();
        summaries.expect_get().returning(|_| Ok(None));

        let mut llm = MockLlmGatewayPort::new();
        llm.expect_chat().returning(|_, _, _, _, _| Ok("hey, still there?".to_string()));

        let mut secret_box = MockSecretBoxPort::new();
        secret_box
            .expect_open()
            .returning(|_| Err(ApplicationError::CryptoTamper("bad tag".to_string())));

        let service = DispatcherService::new(
            Arc::new(tenants),
            Arc::new(integrations),
            Arc::new(conversations),
            Arc::new(MockMessageStorePort::new()),
            Arc::new(summaries),
            Arc::new(llm),
            Arc::new(MockWhatsAppGatewayPort::new()),
            Arc::new(secret_box),
        );

        let counts = service.dispatch_tenant(tenant_id).await.unwrap();
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.sent, 0);
    }
}
