//! SummaryStorePort - persistence for the per-conversation incremental digest

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::{ConversationId, Summary};

use crate::error::ApplicationError;

/// Port for the single Summary row per conversation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SummaryStorePort: Send + Sync {
    /// Fetch the current summary, if one has ever been written
    async fn get(&self, conversation_id: ConversationId) -> Result<Option<Summary>, ApplicationError>;

    /// Insert or replace the summary
    async fn upsert(&self, summary: &Summary) -> Result<(), ApplicationError>;
}
