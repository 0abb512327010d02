//! Value Objects - Immutable, identity-less domain primitives

mod conversation_id;
mod integration_id;
mod message_id;
mod phone_number;
mod tenant_id;

pub use conversation_id::ConversationId;
pub use integration_id::IntegrationId;
pub use message_id::MessageId;
pub use phone_number::{PhoneNumber, to_digits, to_e164};
pub use tenant_id::TenantId;
