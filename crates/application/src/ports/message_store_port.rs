//! MessageStorePort - append-only message persistence with at-most-once inbound inserts

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::{ConversationId, IntegrationId, Message, MessageKind};
use serde_json::Value;

use crate::error::ApplicationError;

/// Port for message persistence. This is the at-most-once boundary: a
/// `provider_msg_id` collision on an inbound append must return the
/// existing row rather than insert a duplicate.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStorePort: Send + Sync {
    /// Insert an inbound message, or return the existing one if
    /// `provider_msg_id` is non-empty and already stored for this
    /// integration. The boolean is `true` only when a new row was inserted.
    #[allow(clippy::too_many_arguments)]
    async fn append_inbound(
        &self,
        integration_id: IntegrationId,
        conversation_id: ConversationId,
        wa_id: &str,
        provider_msg_id: &str,
        kind: MessageKind,
        text: &str,
        payload: Value,
    ) -> Result<(Message, bool), ApplicationError>;

    /// Insert an outbound message. `provider_msg_id` is fabricated by the
    /// caller when the gateway response did not include one.
    #[allow(clippy::too_many_arguments)]
    async fn append_outbound(
        &self,
        integration_id: IntegrationId,
        conversation_id: ConversationId,
        wa_id: &str,
        provider_msg_id: &str,
        kind: MessageKind,
        text: &str,
        payload: Value,
    ) -> Result<Message, ApplicationError>;

    /// The most recent `limit` messages on a conversation, oldest first
    async fn tail(&self, conversation_id: ConversationId, limit: u32) -> Result<Vec<Message>, ApplicationError>;

    /// Messages after the given sequence offset (by insertion order), used
    /// by the summarizer to fetch only the unsummarized tail
    async fn after(&self, conversation_id: ConversationId, offset: u32) -> Result<Vec<Message>, ApplicationError>;

    /// Total message count for a conversation
    async fn count(&self, conversation_id: ConversationId) -> Result<u32, ApplicationError>;

    /// The single most recent message on a conversation, if any
    async fn last(&self, conversation_id: ConversationId) -> Result<Option<Message>, ApplicationError>;
}
