//! TenantStorePort - persistence for Tenant and its per-tenant LLMConfig

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::{LlmConfig, Tenant, TenantId};

use crate::error::ApplicationError;

/// Port for tenant and LLM-configuration persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TenantStorePort: Send + Sync {
    /// Create a new tenant
    async fn create(&self, tenant: &Tenant) -> Result<(), ApplicationError>;

    /// Fetch a tenant by id
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>, ApplicationError>;

    /// List all tenants
    async fn list(&self) -> Result<Vec<Tenant>, ApplicationError>;

    /// Fetch the LLM config for a tenant, if one has been set
    async fn get_llm_config(&self, tenant_id: TenantId) -> Result<Option<LlmConfig>, ApplicationError>;

    /// Insert or replace the LLM config for a tenant
    async fn upsert_llm_config(&self, config: &LlmConfig) -> Result<(), ApplicationError>;
}
