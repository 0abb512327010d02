//! ScheduleStorePort - persistence for per-tenant outreach cadence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use domain::{Schedule, TenantId};

use crate::error::ApplicationError;

/// Port for schedule persistence. [`ScheduleStorePort::try_claim_due`] is the
/// conditional write that guarantees two racing scheduler ticks enqueue at
/// most once for the same tenant.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScheduleStorePort: Send + Sync {
    /// Fetch a tenant's schedule
    async fn get(&self, tenant_id: TenantId) -> Result<Option<Schedule>, ApplicationError>;

    /// Insert or replace a tenant's schedule
    async fn upsert(&self, schedule: &Schedule) -> Result<(), ApplicationError>;

    /// All tenants with an active, due schedule at `now`
    async fn due_tenants(&self, now: DateTime<Utc>) -> Result<Vec<TenantId>, ApplicationError>;

    /// Atomically advance `last_sent` to `now` for a tenant, but only if it
    /// is still due. Returns `true` if this call won the race.
    async fn try_claim_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<bool, ApplicationError>;
}
