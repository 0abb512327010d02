//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod conversation_store_port;
mod integration_store_port;
mod llm_gateway_port;
mod message_store_port;
mod schedule_store_port;
mod secret_box_port;
mod summary_store_port;
mod tenant_store_port;
mod whatsapp_gateway_port;

pub use conversation_store_port::ConversationStorePort;
#[cfg(test)]
pub use conversation_store_port::MockConversationStorePort;
pub use integration_store_port::IntegrationStorePort;
#[cfg(test)]
pub use integration_store_port::MockIntegrationStorePort;
pub use llm_gateway_port::{Evaluation, EvaluationStatus, LlmGatewayPort};
#[cfg(test)]
pub use llm_gateway_port::MockLlmGatewayPort;
pub use message_store_port::MessageStorePort;
#[cfg(test)]
pub use message_store_port::MockMessageStorePort;
pub use schedule_store_port::ScheduleStorePort;
#[cfg(test)]
pub use schedule_store_port::MockScheduleStorePort;
pub use secret_box_port::{NoOpSecretBox, SecretBoxPort};
#[cfg(test)]
pub use secret_box_port::MockSecretBoxPort;
pub use summary_store_port::SummaryStorePort;
#[cfg(test)]
pub use summary_store_port::MockSummaryStorePort;
pub use tenant_store_port::TenantStorePort;
#[cfg(test)]
pub use tenant_store_port::MockTenantStorePort;
pub use whatsapp_gateway_port::{SentMessage, TemplateComponents, WhatsAppGatewayPort};
#[cfg(test)]
pub use whatsapp_gateway_port::MockWhatsAppGatewayPort;
