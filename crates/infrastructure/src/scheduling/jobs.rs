//! The coarse-grained jobs the worker pool drains, one per tenant per kind.

use domain::{ConversationId, TenantId};

/// Unit of work handed to a worker. `EvaluateTenant`/`Dispatch` own one
/// tenant end-to-end; `MaybeReply` is the one exception, scoped to a single
/// conversation, since a reply decision only ever concerns the conversation
/// that just received an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// Run the evaluator over every evaluable conversation of this tenant
    EvaluateTenant(TenantId),
    /// Run the dispatcher's periodic outreach for this tenant
    Dispatch(TenantId),
    /// Generate and send a reply on this conversation, if it is eligible
    MaybeReply(ConversationId),
}
