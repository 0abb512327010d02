//! Message entity - a single inbound or outbound WhatsApp message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{ConversationId, IntegrationId, MessageId};

/// Direction of a message relative to the tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the client
    In,
    /// Sent to the client
    Out,
}

impl Direction {
    /// Label used when rendering a message in a transcript, matching the
    /// convention the summarizer and reply generator read.
    pub fn sender_label(self) -> &'static str {
        match self {
            Self::In => "Client",
            Self::Out => "Sales Engineer",
        }
    }
}

/// The WhatsApp message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Location,
    Contact,
    Sticker,
    Template,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Location => "location",
            Self::Contact => "contact",
            Self::Sticker => "sticker",
            Self::Template => "template",
        };
        write!(f, "{s}")
    }
}

/// A single append-only WhatsApp message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Locally-assigned identifier (primary key)
    pub id: MessageId,
    /// Owning integration
    pub integration_id: IntegrationId,
    /// Owning conversation
    pub conversation_id: ConversationId,
    /// Inbound or outbound
    pub direction: Direction,
    /// The client's MSISDN
    pub wa_id: String,
    /// Provider-assigned message id, used as the at-most-once key for inbound
    /// messages. Empty when the provider did not supply one.
    pub provider_msg_id: String,
    /// Message kind
    pub kind: MessageKind,
    /// Rendered text (for non-text kinds, a `[Kind: ref]` placeholder)
    pub text: String,
    /// Opaque provider payload, preserved for audit/debugging
    pub payload: Value,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a non-text placeholder string in the `[Kind: ref]` convention
    /// used for media messages whose body the agent does not transcribe.
    pub fn placeholder_text(kind: MessageKind, reference: &str) -> String {
        let label = match kind {
            MessageKind::Image => "Image",
            MessageKind::Audio => "Audio",
            MessageKind::Video => "Video",
            MessageKind::Document => "Document",
            MessageKind::Location => "Location",
            MessageKind::Contact => "Contact",
            MessageKind::Sticker => "Sticker",
            MessageKind::Template => "Template",
            MessageKind::Text => "Text",
        };
        format!("[{label}: {reference}]")
    }

    /// Render this message as a single transcript line, the format the
    /// summarizer and reply generator both consume.
    pub fn transcript_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.direction.sender_label(),
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(direction: Direction) -> Message {
        Message {
            id: MessageId::from_provider("wamid.X"),
            integration_id: IntegrationId::new(),
            conversation_id: ConversationId::new(),
            direction,
            wa_id: "+923001234567".to_string(),
            provider_msg_id: "wamid.X".to_string(),
            kind: MessageKind::Text,
            text: "Hi there".to_string(),
            payload: Value::Null,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn inbound_sender_label_is_client() {
        assert_eq!(Direction::In.sender_label(), "Client");
    }

    #[test]
    fn outbound_sender_label_is_sales_engineer() {
        assert_eq!(Direction::Out.sender_label(), "Sales Engineer");
    }

    #[test]
    fn placeholder_text_wraps_kind_and_reference() {
        assert_eq!(
            Message::placeholder_text(MessageKind::Image, "wamid.99"),
            "[Image: wamid.99]"
        );
    }

    #[test]
    fn transcript_line_contains_sender_and_text() {
        let msg = sample(Direction::In);
        let line = msg.transcript_line();
        assert!(line.contains("Client"));
        assert!(line.contains("Hi there"));
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(MessageKind::Template.to_string(), "template");
    }
}
