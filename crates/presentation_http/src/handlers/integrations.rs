//! Operator endpoint to connect a sandbox WhatsApp integration

use axum::{Json, extract::State};
use domain::{IntegrationMode, Tenant, TenantId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SandboxConnectRequest {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub tester_msisdn: String,
}

#[derive(Debug, Serialize)]
pub struct SandboxConnectResponse {
    pub integration_id: String,
}

/// Operator action: `{api_key, tester_msisdn}` → `{integration_id}`. Seals
/// the key, registers the webhook with the provider, and upserts the
/// sandbox integration for the single default tenant.
pub async fn connect_sandbox(
    State(state): State<AppState>,
    Json(request): Json<SandboxConnectRequest>,
) -> Result<Json<SandboxConnectResponse>, ApiError> {
    if request.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("api_key is required"));
    }
    if request.tester_msisdn.trim().is_empty() {
        return Err(ApiError::bad_request("tester_msisdn is required"));
    }

    let tenant_id = TenantId::default();
    if state.tenants.get(tenant_id).await?.is_none() {
        state
            .tenants
            .create(&Tenant {
                id: tenant_id,
                name: "default".to_string(),
            })
            .await?;
    }

    let sealed_key = state.secret_box.seal(&request.api_key).await?;

    let webhook_url = state.config.whatsapp.webhook_public_url.clone();
    state.whatsapp.register_webhook(&request.api_key, &webhook_url).await?;

    let integration = domain::Integration::new(
        tenant_id,
        IntegrationMode::Sandbox,
        sealed_key,
        request.tester_msisdn,
        "",
        "",
        "",
    );
    let integration_id = integration.id;
    state.integrations.upsert(&integration).await?;

    info!(%integration_id, "sandbox integration connected");

    Ok(Json(SandboxConnectResponse {
        integration_id: integration_id.to_string(),
    }))
}
