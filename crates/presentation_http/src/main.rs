//! Automated WhatsApp sales-engineer agent — HTTP server entry point

use std::sync::Arc;

use ai_core::LlmGateway;
use application::{DispatcherService, EvaluatorService, IngressService, ReplyGeneratorService, SchedulerService};
use infrastructure::{AppConfig, ChaChaSecretBox, SqliteStore, WorkerPool, create_pool, scheduling, sweep_stuck_evaluating};
use integration_whatsapp::WhatsAppClient;
use presentation_http::{
    ApiKeyAuthLayer, RateLimiterConfig, RateLimiterLayer, RequestIdLayer, SecurityHeadersLayer, routes,
    state::AppState,
};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sales_engineer_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("sales engineer server v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!(bind_addr = %config.server.bind_addr, "configuration loaded");

    let pool = create_pool(&config.database)?;
    let store = Arc::new(SqliteStore::new(pool));

    let secret_box: Arc<dyn application::ports::SecretBoxPort> =
        Arc::new(ChaChaSecretBox::new(config.master_key_bytes().as_deref())?);

    let whatsapp: Arc<dyn application::ports::WhatsAppGatewayPort> =
        Arc::new(WhatsAppClient::new(config.whatsapp.base_url.clone())?);
    let llm: Arc<dyn application::ports::LlmGatewayPort> =
        Arc::new(LlmGateway::new(config.llm.base_url.clone(), secret_box.clone())?);

    let ingress = Arc::new(IngressService::new(
        store.clone() as Arc<dyn application::ports::IntegrationStorePort>,
        store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        store.clone() as Arc<dyn application::ports::MessageStorePort>,
    ));
    let reply_generator = Arc::new(ReplyGeneratorService::new(
        store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        store.clone() as Arc<dyn application::ports::MessageStorePort>,
        store.clone() as Arc<dyn application::ports::SummaryStorePort>,
        store.clone() as Arc<dyn application::ports::IntegrationStorePort>,
        store.clone() as Arc<dyn application::ports::TenantStorePort>,
        llm.clone(),
        whatsapp.clone(),
        secret_box.clone(),
    ));
    let evaluator = Arc::new(EvaluatorService::new(
        store.clone() as Arc<dyn application::ports::TenantStorePort>,
        store.clone() as Arc<dyn application::ports::IntegrationStorePort>,
        store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        store.clone() as Arc<dyn application::ports::MessageStorePort>,
        store.clone() as Arc<dyn application::ports::SummaryStorePort>,
        llm.clone(),
    ));
    let dispatcher = Arc::new(DispatcherService::new(
        store.clone() as Arc<dyn application::ports::TenantStorePort>,
        store.clone() as Arc<dyn application::ports::IntegrationStorePort>,
        store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        store.clone() as Arc<dyn application::ports::MessageStorePort>,
        store.clone() as Arc<dyn application::ports::SummaryStorePort>,
        llm.clone(),
        whatsapp.clone(),
        secret_box.clone(),
    ));
    let scheduler = Arc::new(SchedulerService::new(
        store.clone() as Arc<dyn application::ports::ScheduleStorePort>,
    ));

    sweep_stuck_evaluating(
        store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        store.clone() as Arc<dyn application::ports::SummaryStorePort>,
        config.scheduler.stuck_evaluating_threshold_minutes,
    )
    .await;

    let worker_pool = Arc::new(WorkerPool::spawn(
        config.scheduler.worker_pool_size,
        evaluator.clone(),
        dispatcher.clone(),
        reply_generator.clone(),
    ));

    let tick_scheduler = scheduler.clone();
    let tick_pool = worker_pool.clone();
    let tick_seconds = config.scheduler.tick_seconds;
    tokio::spawn(async move {
        scheduling::tick::run(tick_scheduler, tick_pool, tick_seconds).await;
    });

    let state = AppState {
        ingress,
        reply_generator,
        evaluator,
        dispatcher,
        scheduler,
        worker_pool,
        integrations: store.clone() as Arc<dyn application::ports::IntegrationStorePort>,
        conversations: store.clone() as Arc<dyn application::ports::ConversationStorePort>,
        messages: store.clone() as Arc<dyn application::ports::MessageStorePort>,
        tenants: store.clone() as Arc<dyn application::ports::TenantStorePort>,
        whatsapp,
        secret_box,
        config: Arc::new(config.clone()),
    };

    let app = routes::create_router(state);

    let rate_limiter = RateLimiterLayer::new(&RateLimiterConfig {
        enabled: true,
        requests_per_minute: config.security.rate_limit_per_minute,
    });
    let auth_layer = match &config.security.admin_api_key {
        Some(key) => ApiKeyAuthLayer::new(key.expose_secret().to_string())
            .exclude_paths(vec!["/webhooks".to_string(), "/health".to_string()]),
        None => ApiKeyAuthLayer::disabled(),
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(rate_limiter)
        .layer(auth_layer)
        .layer(SecurityHeadersLayer::new())
        .layer(RequestIdLayer::new());

    let listener = TcpListener::bind(&config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
