//! Application state shared across handlers

use std::sync::Arc;

use application::ports::{
    ConversationStorePort, IntegrationStorePort, MessageStorePort, SecretBoxPort, TenantStorePort, WhatsAppGatewayPort,
};
use application::{DispatcherService, EvaluatorService, IngressService, ReplyGeneratorService, SchedulerService};
use infrastructure::{AppConfig, WorkerPool};

/// Shared application state, handed to every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Ingests inbound webhook events and stores them
    pub ingress: Arc<IngressService>,
    /// Generates and sends the conversational reply after an inbound message
    pub reply_generator: Arc<ReplyGeneratorService>,
    /// Runs the evaluator/dispatcher passes the worker pool drains
    pub evaluator: Arc<EvaluatorService>,
    /// Periodic-outreach dispatcher
    pub dispatcher: Arc<DispatcherService>,
    /// Claims due tenant cycles for the scheduler tick
    pub scheduler: Arc<SchedulerService>,
    /// Drains `EvaluateTenant`/`Dispatch` jobs in the background
    pub worker_pool: Arc<WorkerPool>,
    /// Read access to integrations, used by handlers that don't go through a service
    pub integrations: Arc<dyn IntegrationStorePort>,
    /// Read access to conversations, used by the conversation-inspection endpoints
    pub conversations: Arc<dyn ConversationStorePort>,
    /// Read access to messages, used to render a conversation's transcript
    pub messages: Arc<dyn MessageStorePort>,
    /// Tenant store, used by the sandbox-connect handler to get-or-create the default tenant
    pub tenants: Arc<dyn TenantStorePort>,
    /// Outbound WhatsApp send, used directly by the send-text operator endpoint
    pub whatsapp: Arc<dyn WhatsAppGatewayPort>,
    /// Seals the provider API key submitted to sandbox-connect
    pub secret_box: Arc<dyn SecretBoxPort>,
    /// Process-wide configuration, loaded once at startup
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("config", &self.config).finish_non_exhaustive()
    }
}
