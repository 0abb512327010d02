//! In-memory job queue and worker pool, draining `Job`s onto the evaluator
//! and dispatcher services.
//!
//! Jobs are coarse-grained (one per tenant) and suspend only at the HTTP/DB
//! boundaries those services already cross; a worker never holds a job across
//! more than one tenant's worth of work.

use std::sync::Arc;

use application::{DispatcherService, EvaluatorService, ReplyGeneratorService};
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, instrument, warn};

use super::jobs::Job;

/// A bounded queue of jobs drained by a fixed-size pool of worker tasks.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    /// Spawn `size` workers draining a shared channel. Each job is handled to
    /// completion before a worker accepts the next; a slow LLM or provider
    /// call only blocks the worker that picked it up.
    pub fn spawn(
        size: usize,
        evaluator: Arc<EvaluatorService>,
        dispatcher: Arc<DispatcherService>,
        reply_generator: Arc<ReplyGeneratorService>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(1024);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..size.max(1) {
            let receiver = receiver.clone();
            let evaluator = evaluator.clone();
            let dispatcher = dispatcher.clone();
            let reply_generator = reply_generator.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, receiver, evaluator, dispatcher, reply_generator).await;
            });
        }

        info!(workers = size, "worker pool started");
        Self { sender }
    }

    /// Enqueue a job. Blocks only if the queue is saturated, which signals
    /// the worker pool is genuinely behind rather than momentarily busy.
    pub async fn enqueue(&self, job: Job) {
        if self.sender.send(job).await.is_err() {
            error!("worker pool channel closed, dropping job");
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    evaluator: Arc<EvaluatorService>,
    dispatcher: Arc<DispatcherService>,
    reply_generator: Arc<ReplyGeneratorService>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            info!(worker_id, "job channel closed, worker exiting");
            return;
        };

        run_job(worker_id, job, &evaluator, &dispatcher, &reply_generator).await;
    }
}

#[instrument(skip(evaluator, dispatcher, reply_generator))]
async fn run_job(
    worker_id: usize,
    job: Job,
    evaluator: &EvaluatorService,
    dispatcher: &DispatcherService,
    reply_generator: &ReplyGeneratorService,
) {
    let result = match job {
        Job::EvaluateTenant(tenant_id) => evaluator
            .evaluate_tenant(tenant_id)
            .await
            .map(|counts| format!("{counts:?}")),
        Job::Dispatch(tenant_id) => dispatcher
            .dispatch_tenant(tenant_id)
            .await
            .map(|counts| format!("{counts:?}")),
        Job::MaybeReply(conversation_id) => reply_generator
            .maybe_reply(conversation_id)
            .await
            .map(|outcome| format!("{outcome:?}")),
    };

    match result {
        Ok(summary) => info!(worker_id, ?job, %summary, "job completed"),
        Err(err) => warn!(worker_id, ?job, %err, "job failed, not retried this tick"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::ApplicationError;
    use application::ports::{
        ConversationStorePort, Evaluation, IntegrationStorePort, LlmGatewayPort, MessageStorePort, NoOpSecretBox,
        SummaryStorePort, TenantStorePort, WhatsAppGatewayPort,
    };
    use async_trait::async_trait;
    use domain::{
        Conversation, ConversationId, ConversationStatus, Integration, IntegrationId, IntegrationMode, LlmConfig,
        Message, MessageKind, StartedBy, Summary, Tenant, TenantId,
    };
    use std::time::Duration;

    /// A `TenantStorePort` reporting no LLM config, so both services
    /// short-circuit before touching any of their other dependencies.
    struct UnconfiguredTenantStore;

    #[async_trait]
    impl TenantStorePort for UnconfiguredTenantStore {
        async fn create(&self, _tenant: &Tenant) -> Result<(), ApplicationError> {
            unimplemented!("not exercised by this test")
        }
        async fn get(&self, _id: TenantId) -> Result<Option<Tenant>, ApplicationError> {
            unimplemented!("not exercised by this test")
        }
        async fn list(&self) -> Result<Vec<Tenant>, ApplicationError> {
            unimplemented!("not exercised by this test")
        }
        async fn get_llm_config(&self, _tenant_id: TenantId) -> Result<Option<LlmConfig>, ApplicationError> {
            Ok(None)
        }
        async fn upsert_llm_config(&self, _config: &LlmConfig) -> Result<(), ApplicationError> {
            unimplemented!("not exercised by this test")
        }
    }

    struct UnusedIntegrationStore;

    #[async_trait]
    impl IntegrationStorePort for UnusedIntegrationStore {
        async fn upsert(&self, _integration: &Integration) -> Result<(), ApplicationError> {
            unimplemented!()
        }
        async fn get(&self, _id: IntegrationId) -> Result<Option<Integration>, ApplicationError> {
            unimplemented!()
        }
        async fn get_by_tenant_and_mode(
            &self,
            _tenant_id: TenantId,
            _mode: IntegrationMode,
        ) -> Result<Option<Integration>, ApplicationError> {
            unimplemented!()
        }
        async fn find_by_tester(&self, _msisdn_variants: &[String]) -> Result<Option<Integration>, ApplicationError> {
            unimplemented!()
        }
        async fn list_for_tenant(&self, _tenant_id: TenantId) -> Result<Vec<Integration>, ApplicationError> {
            unimplemented!()
        }
    }

    struct UnusedConversationStore;

    #[async_trait]
    impl ConversationStorePort for UnusedConversationStore {
        async fn open_or_create(
            &self,
            _integration_id: IntegrationId,
            _wa_id: &str,
            _started_by: StartedBy,
        ) -> Result<(Conversation, bool), ApplicationError> {
            unimplemented!()
        }
        async fn get(&self, _id: ConversationId) -> Result<Option<Conversation>, ApplicationError> {
            Ok(None)
        }
        async fn get_latest_by_wa_id(&self, _wa_id: &str) -> Result<Option<Conversation>, ApplicationError> {
            unimplemented!()
        }
        async fn update_status(
            &self,
            _id: ConversationId,
            _status: ConversationStatus,
        ) -> Result<(), ApplicationError> {
            unimplemented!()
        }
        async fn touch(&self, _id: ConversationId, _at: chrono::DateTime<chrono::Utc>) -> Result<(), ApplicationError> {
            unimplemented!()
        }
        async fn list_evaluable_for_tenant(&self, _tenant_id: TenantId) -> Result<Vec<Conversation>, ApplicationError> {
            unimplemented!()
        }
        async fn list_stuck_evaluating(
            &self,
            _older_than: chrono::DateTime<chrono::Utc>,
        ) -> Result<Vec<Conversation>, ApplicationError> {
            unimplemented!()
        }
        async fn most_recent_dispatch_eligible(
            &self,
            _integration_id: IntegrationId,
        ) -> Result<Option<Conversation>, ApplicationError> {
            unimplemented!()
        }
    }

    struct UnusedMessageStore;

    #[async_trait]
    impl MessageStorePort for UnusedMessageStore {
        async fn append_inbound(
            &self,
            _integration_id: IntegrationId,
            _conversation_id: ConversationId,
            _wa_id: &str,
            _provider_msg_id: &str,
            _kind: MessageKind,
            _text: &str,
            _payload: serde_json::Value,
        ) -> Result<(Message, bool), ApplicationError> {
            unimplemented!()
        }
        async fn append_outbound(
            &self,
            _integration_id: IntegrationId,
            _conversation_id: ConversationId,
            _wa_id: &str,
            _provider_msg_id: &str,
            _kind: MessageKind,
            _text: &str,
            _payload: serde_json::Value,
        ) -> Result<Message, ApplicationError> {
            unimplemented!()
        }
        async fn tail(&self, _conversation_id: ConversationId, _limit: u32) -> Result<Vec<Message>, ApplicationError> {
            unimplemented!()
        }
        async fn after(&self, _conversation_id: ConversationId, _offset: u32) -> Result<Vec<Message>, ApplicationError> {
            unimplemented!()
        }
        async fn count(&self, _conversation_id: ConversationId) -> Result<u32, ApplicationError> {
            unimplemented!()
        }
        async fn last(&self, _conversation_id: ConversationId) -> Result<Option<Message>, ApplicationError> {
            unimplemented!()
        }
    }

    struct UnusedSummaryStore;

    #[async_trait]
    impl SummaryStorePort for UnusedSummaryStore {
        async fn get(&self, _conversation_id: ConversationId) -> Result<Option<Summary>, ApplicationError> {
            unimplemented!()
        }
        async fn upsert(&self, _summary: &Summary) -> Result<(), ApplicationError> {
            unimplemented!()
        }
    }

    struct UnusedLlmGateway;

    #[async_trait]
    impl LlmGatewayPort for UnusedLlmGateway {
        async fn chat(
            &self,
            _config: &LlmConfig,
            _system: &str,
            _user: &str,
            _temperature: Option<f32>,
            _max_tokens: Option<u32>,
        ) -> Result<String, ApplicationError> {
            unimplemented!()
        }
        async fn classify(&self, _config: &LlmConfig, _summary: &str, _context: &str) -> Result<Evaluation, ApplicationError> {
            unimplemented!()
        }
    }

    struct UnusedWhatsAppGateway;

    #[async_trait]
    impl WhatsAppGatewayPort for UnusedWhatsAppGateway {
        async fn register_webhook(&self, _key: &str, _url: &str) -> Result<(), ApplicationError> {
            unimplemented!()
        }
        async fn send_text(
            &self,
            _key: &str,
            _to_digits: &str,
            _body: &str,
        ) -> Result<application::ports::SentMessage, ApplicationError> {
            unimplemented!()
        }
        async fn send_template(
            &self,
            _key: &str,
            _to_digits: &str,
            _template_name: &str,
            _components: application::ports::TemplateComponents,
            _lang: &str,
        ) -> Result<application::ports::SentMessage, ApplicationError> {
            unimplemented!()
        }
    }

    fn idle_evaluator() -> EvaluatorService {
        EvaluatorService::new(
            Arc::new(UnconfiguredTenantStore),
            Arc::new(UnusedIntegrationStore),
            Arc::new(UnusedConversationStore),
            Arc::new(UnusedMessageStore),
            Arc::new(UnusedSummaryStore),
            Arc::new(UnusedLlmGateway),
        )
    }

    fn idle_dispatcher() -> DispatcherService {
        DispatcherService::new(
            Arc::new(UnconfiguredTenantStore),
            Arc::new(UnusedIntegrationStore),
            Arc::new(UnusedConversationStore),
            Arc::new(UnusedMessageStore),
            Arc::new(UnusedSummaryStore),
            Arc::new(UnusedLlmGateway),
            Arc::new(UnusedWhatsAppGateway),
            Arc::new(NoOpSecretBox),
        )
    }

    fn idle_reply_generator() -> ReplyGeneratorService {
        ReplyGeneratorService::new(
            Arc::new(UnusedConversationStore),
            Arc::new(UnusedMessageStore),
            Arc::new(UnusedSummaryStore),
            Arc::new(UnusedIntegrationStore),
            Arc::new(UnconfiguredTenantStore),
            Arc::new(UnusedLlmGateway),
            Arc::new(UnusedWhatsAppGateway),
            Arc::new(NoOpSecretBox),
        )
    }

    #[tokio::test]
    async fn enqueued_jobs_are_drained_without_panicking() {
        let pool = WorkerPool::spawn(
            2,
            Arc::new(idle_evaluator()),
            Arc::new(idle_dispatcher()),
            Arc::new(idle_reply_generator()),
        );
        pool.enqueue(Job::EvaluateTenant(TenantId::new())).await;
        pool.enqueue(Job::Dispatch(TenantId::new())).await;
        pool.enqueue(Job::MaybeReply(ConversationId::new())).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
