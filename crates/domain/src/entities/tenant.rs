//! Tenant entity - the organization a sandbox/production integration belongs to

use serde::{Deserialize, Serialize};

use crate::value_objects::TenantId;

/// An organization using the outreach engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique tenant identifier
    pub id: TenantId,
    /// Display name
    pub name: String,
}

impl Tenant {
    /// Create a new tenant with a freshly generated id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
        }
    }
}
