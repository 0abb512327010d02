//! Evaluator service (C8) - classifies conversations and writes back status

use std::sync::Arc;

use domain::{ConversationStatus, TenantId};
use tracing::{info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{
    ConversationStorePort, EvaluationStatus, IntegrationStorePort, LlmGatewayPort, MessageStorePort,
    SummaryStorePort, TenantStorePort,
};
use crate::services::summarizer_service::SummarizerService;

const EVALUATION_TAIL: u32 = 5;

/// Outcome counters for one `evaluate_tenant` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationCounts {
    pub evaluated: u32,
    pub skipped: u32,
}

/// Classifies every evaluable conversation of a tenant and writes the
/// resulting status back, per the evaluator contract.
pub struct EvaluatorService {
    tenants: Arc<dyn TenantStorePort>,
    integrations: Arc<dyn IntegrationStorePort>,
    conversations: Arc<dyn ConversationStorePort>,
    messages: Arc<dyn MessageStorePort>,
    summaries: Arc<dyn SummaryStorePort>,
    llm: Arc<dyn LlmGatewayPort>,
    summarizer: SummarizerService,
}

impl EvaluatorService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantStorePort>,
        integrations: Arc<dyn IntegrationStorePort>,
        conversations: Arc<dyn ConversationStorePort>,
        messages: Arc<dyn MessageStorePort>,
        summaries: Arc<dyn SummaryStorePort>,
        llm: Arc<dyn LlmGatewayPort>,
    ) -> Self {
        let summarizer = SummarizerService::new(messages.clone(), summaries.clone(), llm.clone());
        Self {
            tenants,
            integrations,
            conversations,
            messages,
            summaries,
            llm,
            summarizer,
        }
    }

    /// Evaluate every conversation of `tenant_id` currently in an evaluable
    /// status. Skips entirely if the tenant has no LLM config or no
    /// integration.
    #[instrument(skip(self))]
    pub async fn evaluate_tenant(&self, tenant_id: TenantId) -> Result<EvaluationCounts, ApplicationError> {
        let mut counts = EvaluationCounts::default();

        let Some(llm_config) = self.tenants.get_llm_config(tenant_id).await? else {
            info!(%tenant_id, "tenant has no LLM config, skipping evaluation");
            return Ok(counts);
        };
        if self.integrations.list_for_tenant(tenant_id).await?.is_empty() {
            info!(%tenant_id, "tenant has no integration, skipping evaluation");
            return Ok(counts);
        }

        for conversation in self.conversations.list_evaluable_for_tenant(tenant_id).await? {
            let current_count = self.messages.count(conversation.id).await?;
            let already_summarized = self
                .summaries
                .get(conversation.id)
                .await?
                .is_some_and(|s| s.msg_count_at_snapshot == current_count);
            if current_count == 0 || already_summarized {
                counts.skipped += 1;
                continue;
            }

            self.conversations
                .update_status(conversation.id, ConversationStatus::Evaluating)
                .await?;

            let summary = self.summarizer.refresh(conversation.id, &llm_config).await?;
            let tail = self.messages.tail(conversation.id, EVALUATION_TAIL).await?;
            let context: String = tail.iter().map(|m| format!("{}\n", m.transcript_line())).collect();

            let evaluation = match self.llm.classify(&llm_config, &summary.content, &context).await {
                Ok(eval) => eval,
                Err(err) => {
                    warn!(%err, conversation_id = %conversation.id, "classification failed, using safe default");
                    crate::ports::Evaluation::safe_default(err.to_string())
                }
            };

            let new_status = match evaluation.status {
                EvaluationStatus::Continue => ConversationStatus::Continue,
                EvaluationStatus::ScheduleLater => ConversationStatus::ScheduleLater,
                EvaluationStatus::Close => ConversationStatus::Closed,
            };
            self.conversations.update_status(conversation.id, new_status).await?;

            let mut summary = summary;
            summary.append_evaluation_footer(&evaluation.status.to_string(), evaluation.confidence);
            self.summaries.upsert(&summary).await?;

            counts.evaluated += 1;
        }

        Ok(counts)
    }
}
