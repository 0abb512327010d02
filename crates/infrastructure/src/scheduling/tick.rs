//! Fixed-interval scheduler tick, replacing the teacher's cron-expression
//! task scheduler with a single `tokio::time::interval` loop — the outreach
//! cadence here is one fixed period, not a set of independently-scheduled
//! cron jobs.

use std::sync::Arc;

use application::SchedulerService;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{info, instrument, warn};

use super::jobs::Job;
use super::worker_pool::WorkerPool;

/// Run the scheduler tick loop forever, enqueuing an `EvaluateTenant` and a
/// `Dispatch` job for every tenant that claims its due cycle each tick.
/// Claiming is always followed by enqueuing, even if the worker pool is
/// backed up - a claimed tick is never silently dropped.
pub async fn run(scheduler: Arc<SchedulerService>, pool: Arc<WorkerPool>, tick_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(tick_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        tick_once(&scheduler, &pool).await;
    }
}

#[instrument(skip(scheduler, pool))]
async fn tick_once(scheduler: &SchedulerService, pool: &WorkerPool) {
    let now = chrono::Utc::now();
    let claimed = match scheduler.claim_due_tenants(now).await {
        Ok(tenants) => tenants,
        Err(err) => {
            warn!(%err, "failed to claim due tenants this tick");
            return;
        }
    };

    if claimed.is_empty() {
        return;
    }
    info!(count = claimed.len(), "tenants claimed for this tick");

    for tenant_id in claimed {
        pool.enqueue(Job::EvaluateTenant(tenant_id)).await;
        pool.enqueue(Job::Dispatch(tenant_id)).await;
    }
}
