//! WhatsApp webhook payload parsing
//!
//! Accepts both the nested Meta-style shape
//! (`entry[*].changes[*].value.messages[*]`) and the flat sandbox shape
//! (`{messages:[...]}`) so the same ingress endpoint works against either.

use domain::MessageKind;
use serde::Deserialize;
use serde_json::Value;

/// One inbound message extracted from either webhook shape, ready to be
/// handed to `application::IngressService::handle_message`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub from: String,
    pub provider_msg_id: String,
    /// Provider-supplied timestamp, verbatim, used to fabricate an id when
    /// `provider_msg_id` is empty. Empty when the provider omitted it too.
    pub provider_timestamp: String,
    pub kind: MessageKind,
    pub text: String,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
struct NestedPayload {
    #[serde(default)]
    entry: Vec<NestedEntry>,
}

#[derive(Debug, Deserialize)]
struct NestedEntry {
    #[serde(default)]
    changes: Vec<NestedChange>,
}

#[derive(Debug, Deserialize)]
struct NestedChange {
    value: NestedValue,
}

#[derive(Debug, Deserialize)]
struct NestedValue {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct FlatPayload {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

#[derive(Debug, Deserialize, Clone)]
struct RawMessage {
    from: String,
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    msg_type: String,
    #[serde(default)]
    text: Option<RawText>,
    #[serde(default)]
    timestamp: String,
    #[serde(flatten)]
    rest: Value,
}

#[derive(Debug, Deserialize, Clone)]
struct RawText {
    body: String,
}

/// Parse a raw webhook body, trying the nested shape first and falling back
/// to the flat shape. Returns an empty vector (not an error) for a body that
/// matches neither - the caller logs and drops it, it never fails the
/// request, since the provider must always see 200.
pub fn parse_inbound(body: &Value) -> Vec<ParsedMessage> {
    if let Ok(nested) = serde_json::from_value::<NestedPayload>(body.clone()) {
        let messages: Vec<RawMessage> = nested
            .entry
            .into_iter()
            .flat_map(|e| e.changes)
            .flat_map(|c| c.value.messages)
            .collect();
        if !messages.is_empty() {
            return messages.into_iter().map(to_parsed).collect();
        }
    }

    if let Ok(flat) = serde_json::from_value::<FlatPayload>(body.clone()) {
        return flat.messages.into_iter().map(to_parsed).collect();
    }

    Vec::new()
}

fn to_parsed(raw: RawMessage) -> ParsedMessage {
    let kind = kind_from_type(&raw.msg_type);
    let text = raw
        .text
        .as_ref()
        .map(|t| t.body.clone())
        .unwrap_or_else(|| domain::Message::placeholder_text(kind, &raw.id));

    ParsedMessage {
        from: raw.from.clone(),
        provider_msg_id: raw.id.clone(),
        provider_timestamp: raw.timestamp.clone(),
        kind,
        text,
        raw: raw.rest,
    }
}

fn kind_from_type(msg_type: &str) -> MessageKind {
    match msg_type {
        "image" => MessageKind::Image,
        "audio" | "voice" => MessageKind::Audio,
        "video" => MessageKind::Video,
        "document" => MessageKind::Document,
        "location" => MessageKind::Location,
        "contacts" => MessageKind::Contact,
        "sticker" => MessageKind::Sticker,
        "template" => MessageKind::Template,
        _ => MessageKind::Text,
    }
}
