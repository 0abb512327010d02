//! Domain entities - Objects with identity and lifecycle

mod conversation;
mod integration;
mod llm_config;
mod message;
mod schedule;
mod summary;
mod tenant;

pub use conversation::{Conversation, ConversationStatus, StartedBy};
pub use integration::{Integration, IntegrationMode};
pub use llm_config::{LlmConfig, LlmModel};
pub use message::{Direction, Message, MessageKind};
pub use schedule::{Frequency, Schedule};
pub use summary::{REFRESH_THRESHOLD, Summary};
pub use tenant::Tenant;
