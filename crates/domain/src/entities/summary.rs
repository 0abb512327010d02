//! Summary entity - an incrementally refreshed per-conversation digest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ConversationId;

/// Minimum growth in message count that forces a summary refresh.
pub const REFRESH_THRESHOLD: u32 = 3;

/// The free-text digest of a conversation plus the machine-readable
/// evaluation footer the evaluator appends after each classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// The conversation this summary belongs to (one per conversation)
    pub conversation_id: ConversationId,
    /// Free-text summary, including any appended `[EVALUATION]` footer
    pub content: String,
    /// Message count at the time this summary was produced
    pub msg_count_at_snapshot: u32,
    /// When this summary was last written
    pub updated_at: DateTime<Utc>,
}

impl Summary {
    /// Construct a fresh summary snapshot
    pub fn new(conversation_id: ConversationId, content: impl Into<String>, msg_count: u32) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            msg_count_at_snapshot: msg_count,
            updated_at: Utc::now(),
        }
    }

    /// True if a refresh is warranted given the conversation's current
    /// message count.
    pub fn needs_refresh(&self, current_msg_count: u32) -> bool {
        current_msg_count > self.msg_count_at_snapshot + REFRESH_THRESHOLD
    }

    /// Append the machine-readable evaluation footer in the
    /// `Status:<label>\nConfidence:<0..1>` convention the evaluator reads
    /// back out when recovering conversation state.
    pub fn append_evaluation_footer(&mut self, status: &str, confidence: f32) {
        self.content
            .push_str(&format!("\n\n[EVALUATION]\nStatus: {status}\nConfidence: {confidence:.2}\n"));
        self.updated_at = Utc::now();
    }

    /// Parse the status recorded in the most recent `[EVALUATION]` footer,
    /// if any. Used by the recovery sweep to infer the status a conversation
    /// had before it was left stuck in `Evaluating`.
    pub fn last_recorded_status(&self) -> Option<&str> {
        let footer_start = self.content.rfind("[EVALUATION]")?;
        let footer = &self.content[footer_start..];
        let line = footer.lines().find(|l| l.starts_with("Status:"))?;
        Some(line.trim_start_matches("Status:").trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_summary_matches_given_msg_count() {
        let summary = Summary::new(ConversationId::new(), "hello", 4);
        assert_eq!(summary.msg_count_at_snapshot, 4);
    }

    #[test]
    fn needs_refresh_is_false_within_threshold() {
        let summary = Summary::new(ConversationId::new(), "hello", 4);
        assert!(!summary.needs_refresh(5));
        assert!(!summary.needs_refresh(7));
    }

    #[test]
    fn needs_refresh_is_true_past_threshold() {
        let summary = Summary::new(ConversationId::new(), "hello", 4);
        assert!(summary.needs_refresh(8));
    }

    #[test]
    fn evaluation_footer_is_appended() {
        let mut summary = Summary::new(ConversationId::new(), "client is interested", 4);
        summary.append_evaluation_footer("continue", 0.83);
        assert!(summary.content.contains("[EVALUATION]"));
        assert!(summary.content.contains("Status: continue"));
        assert!(summary.content.contains("Confidence: 0.83"));
    }

    #[test]
    fn last_recorded_status_reads_back_most_recent_footer() {
        let mut summary = Summary::new(ConversationId::new(), "text", 4);
        summary.append_evaluation_footer("continue", 0.5);
        summary.append_evaluation_footer("schedule_later", 0.9);
        assert_eq!(summary.last_recorded_status(), Some("schedule_later"));
    }

    #[test]
    fn last_recorded_status_is_none_without_footer() {
        let summary = Summary::new(ConversationId::new(), "plain text", 0);
        assert_eq!(summary.last_recorded_status(), None);
    }
}
