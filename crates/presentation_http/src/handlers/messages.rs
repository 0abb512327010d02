//! Operator endpoint for a direct, unconditional outbound text send

use application::ApplicationError;
use axum::{Json, extract::State};
use domain::{IntegrationMode, TenantId, to_digits};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub to: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendTextResponse {
    pub message_id: String,
}

/// Operator action: `{to, text}` → `{message_id}`. Bypasses the
/// conversation/evaluator pipeline entirely — this is a direct send, not a
/// generated reply, so it carries no anti-loop guard and is not gated on
/// conversation status.
pub async fn send_text(
    State(state): State<AppState>,
    Json(request): Json<SendTextRequest>,
) -> Result<Json<SendTextResponse>, ApiError> {
    if request.to.trim().is_empty() || request.text.trim().is_empty() {
        return Err(ApiError::bad_request("to and text are required"));
    }

    let integration = resolve_sending_integration(&state).await?;
    let key = state.secret_box.open(&integration.provider_key_sealed).await?;

    let to_digits = to_digits(&request.to)
        .ok_or_else(|| ApiError::bad_request("to does not contain a valid phone number"))?;

    let sent = state.whatsapp.send_text(&key, &to_digits, &request.text).await?;
    let message_id = sent
        .provider_msg_id
        .unwrap_or_else(|| domain::MessageId::fabricate("out").to_string());

    Ok(Json(SendTextResponse { message_id }))
}

async fn resolve_sending_integration(state: &AppState) -> Result<domain::Integration, ApiError> {
    let tenant_id = TenantId::default();
    if let Some(integration) = state
        .integrations
        .get_by_tenant_and_mode(tenant_id, IntegrationMode::Prod)
        .await?
    {
        return Ok(integration);
    }
    state
        .integrations
        .get_by_tenant_and_mode(tenant_id, IntegrationMode::Sandbox)
        .await?
        .ok_or_else(|| ApplicationError::NotFound("no connected integration for the default tenant".to_string()).into())
}
