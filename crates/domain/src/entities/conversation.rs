//! Conversation entity - the lifecycle state of one client thread

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ConversationId, IntegrationId};

/// Who originated this conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartedBy {
    /// An operator opened it manually
    Admin,
    /// The client messaged in first
    Contact,
    /// The dispatcher opened it as part of periodic outreach
    System,
}

/// Conversation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationStatus {
    /// Freshly created, not yet evaluated
    Open,
    /// Evaluated as actively engaged
    Continue,
    /// Evaluated as wanting a later follow-up
    ScheduleLater,
    /// An evaluation job currently holds this conversation
    Evaluating,
    /// Terminal: no further transitions are permitted
    Closed,
}

impl ConversationStatus {
    /// Statuses the evaluator considers for classification
    pub fn is_evaluable(self) -> bool {
        matches!(
            self,
            Self::Open | Self::Continue | Self::ScheduleLater | Self::Evaluating
        )
    }

    /// Statuses the dispatcher considers for periodic outreach. `Continue`
    /// is excluded: a client who is actively engaged should not receive an
    /// unsolicited nudge.
    pub fn is_dispatch_eligible(self) -> bool {
        matches!(self, Self::Open | Self::ScheduleLater | Self::Evaluating)
    }

    /// True for the terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Continue => "continue",
            Self::ScheduleLater => "schedule_later",
            Self::Evaluating => "evaluating",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// A client thread, owned by one [`IntegrationId`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier
    pub id: ConversationId,
    /// Owning integration
    pub integration_id: IntegrationId,
    /// The client's MSISDN, canonical `+E164` form
    pub wa_id: String,
    /// Who started the conversation
    pub started_by: StartedBy,
    /// Current lifecycle status
    pub status: ConversationStatus,
    /// When the conversation was opened
    pub started_at: DateTime<Utc>,
    /// Timestamp of the most recent message on this conversation
    pub last_msg_at: DateTime<Utc>,
}

impl Conversation {
    /// Open a new conversation. `started_at` and `last_msg_at` start equal.
    pub fn open(integration_id: IntegrationId, wa_id: impl Into<String>, started_by: StartedBy) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            integration_id,
            wa_id: wa_id.into(),
            started_by,
            status: ConversationStatus::Open,
            started_at: now,
            last_msg_at: now,
        }
    }

    /// Record that a message just arrived on this conversation.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_msg_at {
            self.last_msg_at = at;
        }
    }

    /// Attempt a status transition, refusing any transition out of `Closed`.
    pub fn transition_to(&mut self, next: ConversationStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::NotPermitted(format!(
                "conversation {} is closed and cannot transition to {next}",
                self.id
            )));
        }
        self.status = next;
        Ok(())
    }

    /// True if this conversation's status is one the evaluator should visit
    pub fn is_evaluable(&self) -> bool {
        self.status.is_evaluable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        Conversation::open(IntegrationId::new(), "+923001234567", StartedBy::Contact)
    }

    #[test]
    fn new_conversation_starts_open() {
        assert_eq!(sample().status, ConversationStatus::Open);
    }

    #[test]
    fn started_at_equals_last_msg_at_on_open() {
        let conv = sample();
        assert_eq!(conv.started_at, conv.last_msg_at);
    }

    #[test]
    fn touch_advances_last_msg_at_monotonically() {
        let mut conv = sample();
        let earlier = conv.last_msg_at - chrono::Duration::seconds(10);
        conv.touch(earlier);
        assert_ne!(conv.last_msg_at, earlier);
    }

    #[test]
    fn touch_updates_to_a_later_timestamp() {
        let mut conv = sample();
        let later = conv.last_msg_at + chrono::Duration::seconds(10);
        conv.touch(later);
        assert_eq!(conv.last_msg_at, later);
    }

    #[test]
    fn transition_from_open_to_continue_succeeds() {
        let mut conv = sample();
        conv.transition_to(ConversationStatus::Continue).unwrap();
        assert_eq!(conv.status, ConversationStatus::Continue);
    }

    #[test]
    fn transition_out_of_closed_is_refused() {
        let mut conv = sample();
        conv.transition_to(ConversationStatus::Closed).unwrap();
        assert!(conv.transition_to(ConversationStatus::Open).is_err());
        assert_eq!(conv.status, ConversationStatus::Closed);
    }

    #[test]
    fn continue_is_excluded_from_dispatch_eligibility() {
        assert!(!ConversationStatus::Continue.is_dispatch_eligible());
        assert!(ConversationStatus::ScheduleLater.is_dispatch_eligible());
    }

    #[test]
    fn closed_is_not_evaluable() {
        assert!(!ConversationStatus::Closed.is_evaluable());
        assert!(ConversationStatus::Evaluating.is_evaluable());
    }

    #[test]
    fn status_displays_snake_case() {
        assert_eq!(ConversationStatus::ScheduleLater.to_string(), "schedule_later");
    }
}
