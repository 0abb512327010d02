//! Scheduler service (C10) - decides which tenants are due for a cycle
//!
//! The actual timer loop (fixed-period ticking) lives in infrastructure;
//! this service only answers "which tenants are due right now" and claims
//! them one at a time so two overlapping ticks can never double-enqueue the
//! same tenant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::TenantId;
use tracing::{instrument, warn};

use crate::error::ApplicationError;
use crate::ports::ScheduleStorePort;

/// Decides due tenants and claims them under the schedule's CAS guarantee.
pub struct SchedulerService {
    schedules: Arc<dyn ScheduleStorePort>,
}

impl SchedulerService {
    pub fn new(schedules: Arc<dyn ScheduleStorePort>) -> Self {
        Self { schedules }
    }

    /// Return the tenants that successfully claimed their due cycle at `now`.
    /// A tenant reported by [`ScheduleStorePort::due_tenants`] but lost to a
    /// racing claim is silently excluded - this is the expected outcome of
    /// the race, not a failure.
    #[instrument(skip(self))]
    pub async fn claim_due_tenants(&self, now: DateTime<Utc>) -> Result<Vec<TenantId>, ApplicationError> {
        let candidates = self.schedules.due_tenants(now).await?;
        let mut claimed = Vec::with_capacity(candidates.len());

        for tenant_id in candidates {
            match self.schedules.try_claim_due(tenant_id, now).await {
                Ok(true) => claimed.push(tenant_id),
                Ok(false) => {}
                Err(err) => warn!(%tenant_id, %err, "failed to claim due schedule"),
            }
        }

        Ok(claimed)
    }
}
