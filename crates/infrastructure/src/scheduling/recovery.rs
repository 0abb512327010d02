//! Startup recovery sweep for conversations abandoned mid-evaluation
//!
//! A worker that dies (or is killed) while holding a conversation in
//! `EVALUATING` leaves it stuck there forever unless something sweeps it back
//! on the next startup. The swept-to status is read from the summary's most
//! recent `[EVALUATION]` footer so a conversation resumes where its last
//! completed evaluation left it, rather than always bouncing to `OPEN`.

use std::sync::Arc;

use application::{ConversationStorePort, SummaryStorePort};
use chrono::{Duration, Utc};
use domain::ConversationStatus;
use tracing::{info, instrument, warn};

fn status_from_footer(label: &str) -> ConversationStatus {
    match label {
        "continue" => ConversationStatus::Continue,
        "schedule_later" => ConversationStatus::ScheduleLater,
        "close" => ConversationStatus::Closed,
        _ => ConversationStatus::Open,
    }
}

/// Sweep every conversation stuck in `EVALUATING` for longer than
/// `threshold_minutes` back to the status implied by its last recorded
/// evaluation, or `OPEN` if it has never been evaluated.
#[instrument(skip(conversations, summaries))]
pub async fn sweep_stuck_evaluating(
    conversations: Arc<dyn ConversationStorePort>,
    summaries: Arc<dyn SummaryStorePort>,
    threshold_minutes: i64,
) {
    let older_than = Utc::now() - Duration::minutes(threshold_minutes);

    let stuck = match conversations.list_stuck_evaluating(older_than).await {
        Ok(conversations) => conversations,
        Err(err) => {
            warn!(%err, "failed to list conversations stuck in EVALUATING");
            return;
        }
    };

    if stuck.is_empty() {
        return;
    }
    info!(count = stuck.len(), "recovering conversations stuck in EVALUATING");

    for conversation in stuck {
        let recovered_status = match summaries.get(conversation.id).await {
            Ok(Some(summary)) => summary
                .last_recorded_status()
                .map(status_from_footer)
                .unwrap_or(ConversationStatus::Open),
            Ok(None) => ConversationStatus::Open,
            Err(err) => {
                warn!(%err, conversation_id = %conversation.id, "failed to read summary during recovery, defaulting to OPEN");
                ConversationStatus::Open
            }
        };

        if let Err(err) = conversations.update_status(conversation.id, recovered_status).await {
            warn!(%err, conversation_id = %conversation.id, "failed to write recovered status");
        }
    }
}
