//! Summarizer service (C7) - incremental per-conversation digest

use std::sync::Arc;

use domain::{ConversationId, LlmConfig, Summary};
use tracing::instrument;

use crate::error::ApplicationError;
use crate::ports::{LlmGatewayPort, MessageStorePort, SummaryStorePort};

const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 800;

const SUMMARY_SYSTEM_PROMPT: &str = "You maintain a running summary of a sales conversation between \
a sales engineer and a prospective client over WhatsApp. Given the prior summary (if any) and the \
new messages since that summary, produce an updated, concise summary covering: topics discussed, \
client interests, and any agreed next steps. Do not include the raw transcript in your answer.";

/// Refreshes a conversation's [`Summary`] from its message history
pub struct SummarizerService {
    messages: Arc<dyn MessageStorePort>,
    summaries: Arc<dyn SummaryStorePort>,
    llm: Arc<dyn LlmGatewayPort>,
}

impl SummarizerService {
    pub fn new(
        messages: Arc<dyn MessageStorePort>,
        summaries: Arc<dyn SummaryStorePort>,
        llm: Arc<dyn LlmGatewayPort>,
    ) -> Self {
        Self {
            messages,
            summaries,
            llm,
        }
    }

    /// Recompute the summary if the conversation has grown enough since the
    /// last snapshot; otherwise return the existing one unchanged.
    #[instrument(skip(self, llm_config))]
    pub async fn refresh(
        &self,
        conversation_id: ConversationId,
        llm_config: &LlmConfig,
    ) -> Result<Summary, ApplicationError> {
        let existing = self.summaries.get(conversation_id).await?;
        let current_count = self.messages.count(conversation_id).await?;

        if let Some(summary) = &existing {
            if !summary.needs_refresh(current_count) {
                return Ok(summary.clone());
            }
        }

        let offset = existing.as_ref().map_or(0, |s| s.msg_count_at_snapshot);
        let tail = self.messages.after(conversation_id, offset).await?;
        if tail.is_empty() {
            if let Some(summary) = existing {
                return Ok(summary);
            }
        }

        let prior_text = existing.as_ref().map_or(String::new(), |s| s.content.clone());
        let tail_text: String = tail.iter().map(|m| format!("{}\n", m.transcript_line())).collect();
        let user_prompt = format!(
            "Prior summary:\n{prior_text}\n\nNew messages:\n{tail_text}"
        );

        let content = self
            .llm
            .chat(
                llm_config,
                SUMMARY_SYSTEM_PROMPT,
                &user_prompt,
                Some(SUMMARY_TEMPERATURE),
                Some(SUMMARY_MAX_TOKENS),
            )
            .await?;

        let summary = Summary::new(conversation_id, content, current_count);
        self.summaries.upsert(&summary).await?;
        Ok(summary)
    }
}
