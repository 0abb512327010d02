//! Inbound WhatsApp webhook
//!
//! Always returns 200: a provider that gets anything else will retry
//! delivery indefinitely, and a malformed or unroutable message is not the
//! provider's problem to resolve.

use application::InboundEvent;
use axum::{Json, extract::State, http::StatusCode};
use infrastructure::Job;
use integration_whatsapp::parse_inbound;
use serde_json::Value;
use tracing::warn;

use crate::state::AppState;

pub async fn receive_webhook(State(state): State<AppState>, Json(body): Json<Value>) -> StatusCode {
    for message in parse_inbound(&body) {
        let event = InboundEvent {
            from_raw: message.from,
            provider_msg_id: if message.provider_msg_id.is_empty() {
                None
            } else {
                Some(message.provider_msg_id)
            },
            provider_timestamp: message.provider_timestamp,
            kind: message.kind,
            text: message.text,
            payload: message.raw,
        };

        match state.ingress.handle_message(event).await {
            Ok(Some(outcome)) => {
                state.worker_pool.enqueue(Job::EvaluateTenant(outcome.tenant_id)).await;
                // The conversation may already be in CONTINUE from an earlier
                // evaluation cycle; let the reply generator decide, it no-ops
                // otherwise.
                state.worker_pool.enqueue(Job::MaybeReply(outcome.conversation_id)).await;
            },
            Ok(None) => {},
            Err(err) => warn!(%err, "failed to ingest inbound message, skipping"),
        }
    }

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_body_yields_no_messages_to_process() {
        let body = serde_json::json!({"unexpected": "shape"});
        assert!(parse_inbound(&body).is_empty());
    }
}
