//! Operator endpoints for inspecting a conversation's transcript

use application::ReplyOutcome;
use axum::{Json, extract::{Path, State}};
use chrono::{DateTime, Utc};
use domain::{ConversationId, ConversationStatus, Direction, MessageKind};
use serde::Serialize;

use crate::{error::ApiError, state::AppState};

const INSPECT_TAIL: u32 = 20;

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub direction: Direction,
    pub kind: MessageKind,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub id: String,
    pub wa_id: String,
    pub status: ConversationStatus,
    pub started_at: DateTime<Utc>,
    pub last_msg_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
}

async fn render(state: &AppState, conversation: domain::Conversation) -> Result<ConversationView, ApiError> {
    let tail = state.messages.tail(conversation.id, INSPECT_TAIL).await?;
    Ok(ConversationView {
        id: conversation.id.to_string(),
        wa_id: conversation.wa_id,
        status: conversation.status,
        started_at: conversation.started_at,
        last_msg_at: conversation.last_msg_at,
        messages: tail
            .into_iter()
            .map(|m| MessageView {
                direction: m.direction,
                kind: m.kind,
                text: m.text,
                created_at: m.created_at,
            })
            .collect(),
    })
}

/// `GET /api/conversations/{id}` — formatted conversation tail for inspection
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let conversation_id = ConversationId::parse(&id).map_err(|_| ApiError::bad_request("invalid conversation id"))?;
    let conversation = state
        .conversations
        .get(conversation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("conversation not found"))?;
    Ok(Json(render(&state, conversation).await?))
}

/// `GET /api/conversations/by-number/{wa_id}` — latest conversation for an MSISDN
pub async fn get_conversation_by_number(
    State(state): State<AppState>,
    Path(wa_id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let conversation = state
        .conversations
        .get_latest_by_wa_id(&wa_id)
        .await?
        .ok_or_else(|| ApiError::not_found("no conversation for that number"))?;
    Ok(Json(render(&state, conversation).await?))
}

#[derive(Debug, Serialize)]
#[serde(tag = "result")]
pub enum ReplyResponse {
    Sent { message_id: String },
    Skipped { reason: &'static str },
}

impl From<ReplyOutcome> for ReplyResponse {
    fn from(outcome: ReplyOutcome) -> Self {
        match outcome {
            ReplyOutcome::Sent { message_id } => Self::Sent { message_id },
            ReplyOutcome::Skipped { reason } => Self::Skipped { reason },
        }
    }
}

/// `POST /api/conversations/{id}/reply` — operator-triggered reply attempt.
/// Runs the same eligibility checks and anti-loop guard as the automatic
/// reply job; this just lets an operator ask for it out of band.
pub async fn trigger_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let conversation_id = ConversationId::parse(&id).map_err(|_| ApiError::bad_request("invalid conversation id"))?;
    let outcome = state.reply_generator.maybe_reply(conversation_id).await?;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_conversation_id_fails_to_parse() {
        assert!(ConversationId::parse("not-a-uuid").is_err());
    }
}
