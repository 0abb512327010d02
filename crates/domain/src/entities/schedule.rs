//! Schedule entity - per-tenant outreach cadence

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::TenantId;

/// How often a tenant's periodic outreach tick fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// For integration testing only
    Minute,
    Daily,
    Weekly,
    Monthly,
    /// No periodic outreach
    Disabled,
}

impl Frequency {
    /// The elapsed time required between two consecutive `last_sent` values.
    /// Returns `None` for `Disabled`, which has no period.
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Minute => Some(Duration::seconds(60)),
            Self::Daily => Some(Duration::hours(24)),
            Self::Weekly => Some(Duration::days(7)),
            Self::Monthly => Some(Duration::days(30)),
            Self::Disabled => None,
        }
    }
}

/// A tenant's periodic outreach schedule. One per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Cadence
    pub frequency: Frequency,
    /// Whether periodic outreach is currently enabled
    pub is_active: bool,
    /// The last time this schedule fired, if ever
    pub last_sent: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Construct a schedule that has never fired.
    pub fn new(tenant_id: TenantId, frequency: Frequency) -> Self {
        Self {
            tenant_id,
            frequency,
            is_active: true,
            last_sent: None,
        }
    }

    /// When this schedule is next due, or `None` if it will never fire
    /// (inactive, disabled, or the period has not yet elapsed — in which
    /// case this returns `None` relative to `now`, use [`Schedule::is_due`]
    /// for a boolean check against a specific instant).
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        if !self.is_active {
            return None;
        }
        let period = self.frequency.period()?;
        match self.last_sent {
            None => Some(Utc::now() - Duration::seconds(1)), // immediately due
            Some(last) => Some(last + period),
        }
    }

    /// Whether this schedule is due to fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        let Some(period) = self.frequency.period() else {
            return false;
        };
        match self.last_sent {
            None => true,
            Some(last) => now >= last + period,
        }
    }

    /// Conditionally advance `last_sent` to `now`, but only if the schedule
    /// is still due and the stored `last_sent` still matches `expected` —
    /// the compare-and-swap that lets two racing scheduler ticks enqueue at
    /// most once for this tenant.
    pub fn try_mark_sent(&mut self, expected: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if self.last_sent != expected || !self.is_due(now) {
            return false;
        }
        self.last_sent = Some(now);
        true
    }
}
