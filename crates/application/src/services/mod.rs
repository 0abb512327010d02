//! Application services - Use case implementations

mod dispatcher_service;
mod evaluator_service;
mod ingress_service;
mod reply_generator_service;
mod scheduler_service;
mod summarizer_service;

pub use dispatcher_service::{DispatchCounts, DispatcherService};
pub use evaluator_service::{EvaluationCounts, EvaluatorService};
pub use ingress_service::{IngestOutcome, IngressService, InboundEvent};
pub use reply_generator_service::{ReplyGeneratorService, ReplyOutcome};
pub use scheduler_service::SchedulerService;
pub use summarizer_service::SummarizerService;
