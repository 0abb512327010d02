//! Message identifier
//!
//! Unlike the other identifiers in this module, a [`MessageId`] is not always
//! a UUID: inbound messages carry the provider's own message id, and outbound
//! messages fabricate one when the gateway does not return one (see
//! `MessageId::fabricate`). The wrapped value is therefore a plain string.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A message identifier, either provider-issued or locally fabricated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a provider-issued message id
    pub fn from_provider(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fabricate a locally unique id with the given origin prefix
    /// (e.g. `out`, `template`, `periodic`, `ai_reply`, `in`).
    pub fn fabricate(origin: &str) -> Self {
        Self(format!("{origin}_{}", Uuid::new_v4()))
    }

    /// Borrow the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this id was fabricated locally rather than issued by the provider
    pub fn is_local(&self) -> bool {
        self.0.contains('_') && Uuid::parse_str(self.0.rsplit('_').next().unwrap_or("")).is_ok()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_is_preserved_verbatim() {
        let id = MessageId::from_provider("wamid.ABC123");
        assert_eq!(id.as_str(), "wamid.ABC123");
    }

    #[test]
    fn fabricated_ids_are_unique() {
        assert_ne!(MessageId::fabricate("out"), MessageId::fabricate("out"));
    }

    #[test]
    fn fabricated_id_carries_origin_prefix() {
        let id = MessageId::fabricate("periodic");
        assert!(id.as_str().starts_with("periodic_"));
    }

    #[test]
    fn fabricated_id_is_local() {
        assert!(MessageId::fabricate("out").is_local());
    }

    #[test]
    fn provider_id_is_not_local() {
        assert!(!MessageId::from_provider("wamid.ABC123").is_local());
    }
}
