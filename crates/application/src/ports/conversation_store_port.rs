//! ConversationStorePort - persistence for Conversation lifecycle state

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::{Conversation, ConversationId, ConversationStatus, IntegrationId, StartedBy, TenantId};

use crate::error::ApplicationError;

/// Port for conversation persistence. Enforces that at most one
/// non-terminal conversation exists per `(integration_id, wa_id)`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConversationStorePort: Send + Sync {
    /// Return the existing non-terminal conversation for `(integration, wa_id)`,
    /// or atomically create and return a new `Open` one. The boolean
    /// indicates whether a new row was created.
    async fn open_or_create(
        &self,
        integration_id: IntegrationId,
        wa_id: &str,
        started_by: StartedBy,
    ) -> Result<(Conversation, bool), ApplicationError>;

    /// Fetch by id
    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>, ApplicationError>;

    /// Fetch the most recent conversation for a given MSISDN, regardless of status
    async fn get_latest_by_wa_id(&self, wa_id: &str) -> Result<Option<Conversation>, ApplicationError>;

    /// Persist a status transition
    async fn update_status(
        &self,
        id: ConversationId,
        status: ConversationStatus,
    ) -> Result<(), ApplicationError>;

    /// Advance `last_msg_at` to at least `at`
    async fn touch(&self, id: ConversationId, at: chrono::DateTime<chrono::Utc>) -> Result<(), ApplicationError>;

    /// All conversations belonging to a tenant whose status the evaluator
    /// should visit (`OPEN`, `CONTINUE`, `SCHEDULE_LATER`, `EVALUATING`)
    async fn list_evaluable_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Conversation>, ApplicationError>;

    /// All conversations anywhere stuck in `EVALUATING`, for the startup
    /// recovery sweep. `older_than` filters to conversations whose
    /// `last_msg_at` predates the given instant.
    async fn list_stuck_evaluating(
        &self,
        older_than: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Conversation>, ApplicationError>;

    /// The most recently touched conversation for an integration whose
    /// status is dispatch-eligible (`OPEN`, `SCHEDULE_LATER`, `EVALUATING`)
    async fn most_recent_dispatch_eligible(
        &self,
        integration_id: IntegrationId,
    ) -> Result<Option<Conversation>, ApplicationError>;
}
