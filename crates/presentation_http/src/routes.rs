//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes. Authentication and rate-limiting
/// layers are applied by the caller (`main.rs`), since the webhook route
/// must be excluded from auth but the rest of the surface must not be.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/webhooks/whatsapp/provider", post(handlers::ingress::receive_webhook))
        .route("/integrations/sandbox/connect", post(handlers::integrations::connect_sandbox))
        .route("/api/send-text", post(handlers::messages::send_text))
        .route("/api/conversations/{id}", get(handlers::conversations::get_conversation))
        .route(
            "/api/conversations/by-number/{wa_id}",
            get(handlers::conversations::get_conversation_by_number),
        )
        .route("/api/conversations/{id}/reply", post(handlers::conversations::trigger_reply))
        .with_state(state)
}
