//! IntegrationStorePort - persistence for a tenant's provider integrations

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use domain::{Integration, IntegrationId, IntegrationMode, TenantId};

use crate::error::ApplicationError;

/// Port for integration persistence. Enforces the `(tenant_id, mode)`
/// uniqueness invariant: [`IntegrationStorePort::upsert`] replaces the
/// existing row for that pair rather than creating a second one.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IntegrationStorePort: Send + Sync {
    /// Insert or replace the integration for `(tenant_id, mode)`
    async fn upsert(&self, integration: &Integration) -> Result<(), ApplicationError>;

    /// Fetch by id
    async fn get(&self, id: IntegrationId) -> Result<Option<Integration>, ApplicationError>;

    /// Fetch the one integration for a `(tenant, mode)` pair
    async fn get_by_tenant_and_mode(
        &self,
        tenant_id: TenantId,
        mode: IntegrationMode,
    ) -> Result<Option<Integration>, ApplicationError>;

    /// Find the integration whose `tester_msisdn` matches the given number,
    /// trying `+E164`, bare digits, and the raw string in that order to
    /// absorb provider formatting variance. The first hit wins.
    async fn find_by_tester(&self, msisdn_variants: &[String]) -> Result<Option<Integration>, ApplicationError>;

    /// List every integration belonging to a tenant
    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Integration>, ApplicationError>;
}
