//! SQLite adapters for every store port, sharing one r2d2 connection pool.
//!
//! Every method runs its SQL on `spawn_blocking` since `rusqlite` is
//! synchronous, the same bridging pattern the teacher's old connection pool
//! used for its blocking-io adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Conversation, ConversationId, ConversationStatus, Direction, Integration, IntegrationId, IntegrationMode,
    LlmConfig, LlmModel, Message, MessageId, MessageKind, Schedule, StartedBy, Summary, Tenant, TenantId,
};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, named_params};
use uuid::Uuid;

use application::{
    ApplicationError, ConversationStorePort, IntegrationStorePort, MessageStorePort, ScheduleStorePort,
    SummaryStorePort, TenantStorePort,
};

use super::connection::ConnectionPool;

/// Shared SQLite-backed implementation of every store port
#[derive(Clone)]
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

async fn with_conn<F, T>(pool: &ConnectionPool, f: F) -> Result<T, ApplicationError>
where
    F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApplicationError::Internal(format!("connection pool error: {e}")))?;
        f(&mut conn).map_err(|e| ApplicationError::Internal(format!("sqlite error: {e}")))
    })
    .await
    .map_err(|e| ApplicationError::Internal(format!("database task panicked: {e}")))?
}

fn uuid_conversion_err(e: uuid::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn enum_conversion_err(field: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unrecognized {field}: {value}").into(),
    )
}

fn datetime_conversion_err(e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(uuid_conversion_err)
}

fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(datetime_conversion_err)
}

fn parse_integration_mode(s: &str) -> rusqlite::Result<IntegrationMode> {
    match s {
        "sandbox" => Ok(IntegrationMode::Sandbox),
        "prod" => Ok(IntegrationMode::Prod),
        other => Err(enum_conversion_err("integration mode", other)),
    }
}

fn parse_llm_model(s: &str) -> rusqlite::Result<LlmModel> {
    match s {
        "fast" => Ok(LlmModel::Fast),
        "accurate" => Ok(LlmModel::Accurate),
        "extended" => Ok(LlmModel::Extended),
        other => Err(enum_conversion_err("LLM model", other)),
    }
}

fn parse_started_by(s: &str) -> rusqlite::Result<StartedBy> {
    match s {
        "admin" => Ok(StartedBy::Admin),
        "contact" => Ok(StartedBy::Contact),
        "system" => Ok(StartedBy::System),
        other => Err(enum_conversion_err("started_by", other)),
    }
}

fn parse_conversation_status(s: &str) -> rusqlite::Result<ConversationStatus> {
    match s {
        "open" => Ok(ConversationStatus::Open),
        "continue" => Ok(ConversationStatus::Continue),
        "schedule_later" => Ok(ConversationStatus::ScheduleLater),
        "evaluating" => Ok(ConversationStatus::Evaluating),
        "closed" => Ok(ConversationStatus::Closed),
        other => Err(enum_conversion_err("conversation status", other)),
    }
}

fn conversation_status_str(status: ConversationStatus) -> &'static str {
    match status {
        ConversationStatus::Open => "open",
        ConversationStatus::Continue => "continue",
        ConversationStatus::ScheduleLater => "schedule_later",
        ConversationStatus::Evaluating => "evaluating",
        ConversationStatus::Closed => "closed",
    }
}

fn parse_direction(s: &str) -> rusqlite::Result<Direction> {
    match s {
        "in" => Ok(Direction::In),
        "out" => Ok(Direction::Out),
        other => Err(enum_conversion_err("direction", other)),
    }
}

fn parse_message_kind(s: &str) -> rusqlite::Result<MessageKind> {
    match s {
        "text" => Ok(MessageKind::Text),
        "image" => Ok(MessageKind::Image),
        "audio" => Ok(MessageKind::Audio),
        "video" => Ok(MessageKind::Video),
        "document" => Ok(MessageKind::Document),
        "location" => Ok(MessageKind::Location),
        "contact" => Ok(MessageKind::Contact),
        "sticker" => Ok(MessageKind::Sticker),
        "template" => Ok(MessageKind::Template),
        other => Err(enum_conversion_err("message kind", other)),
    }
}

fn parse_frequency(s: &str) -> rusqlite::Result<domain::Frequency> {
    match s {
        "minute" => Ok(domain::Frequency::Minute),
        "daily" => Ok(domain::Frequency::Daily),
        "weekly" => Ok(domain::Frequency::Weekly),
        "monthly" => Ok(domain::Frequency::Monthly),
        "disabled" => Ok(domain::Frequency::Disabled),
        other => Err(enum_conversion_err("frequency", other)),
    }
}

fn frequency_str(frequency: domain::Frequency) -> &'static str {
    match frequency {
        domain::Frequency::Minute => "minute",
        domain::Frequency::Daily => "daily",
        domain::Frequency::Weekly => "weekly",
        domain::Frequency::Monthly => "monthly",
        domain::Frequency::Disabled => "disabled",
    }
}

fn row_to_tenant(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    let id: String = row.get("id")?;
    Ok(Tenant {
        id: TenantId::from_uuid(parse_uuid(&id)?),
        name: row.get("name")?,
    })
}

fn row_to_llm_config(row: &Row<'_>) -> rusqlite::Result<LlmConfig> {
    let tenant_id: String = row.get("tenant_id")?;
    let model: String = row.get("model")?;
    Ok(LlmConfig {
        tenant_id: TenantId::from_uuid(parse_uuid(&tenant_id)?),
        api_key_sealed: row.get("api_key_sealed")?,
        model: parse_llm_model(&model)?,
        temperature: row.get("temperature")?,
        max_tokens: row.get::<_, i64>("max_tokens")? as u32,
    })
}

fn row_to_integration(row: &Row<'_>) -> rusqlite::Result<Integration> {
    let id: String = row.get("id")?;
    let tenant_id: String = row.get("tenant_id")?;
    let mode: String = row.get("mode")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Integration {
        id: IntegrationId::from_uuid(parse_uuid(&id)?),
        tenant_id: TenantId::from_uuid(parse_uuid(&tenant_id)?),
        mode: parse_integration_mode(&mode)?,
        provider_key_sealed: row.get("provider_key_sealed")?,
        tester_msisdn: row.get("tester_msisdn")?,
        client_context: row.get("client_context")?,
        project_context: row.get("project_context")?,
        custom_instructions: row.get("custom_instructions")?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let id: String = row.get("id")?;
    let integration_id: String = row.get("integration_id")?;
    let started_by: String = row.get("started_by")?;
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let last_msg_at: String = row.get("last_msg_at")?;
    Ok(Conversation {
        id: ConversationId::from_uuid(parse_uuid(&id)?),
        integration_id: IntegrationId::from_uuid(parse_uuid(&integration_id)?),
        wa_id: row.get("wa_id")?,
        started_by: parse_started_by(&started_by)?,
        status: parse_conversation_status(&status)?,
        started_at: parse_datetime(&started_at)?,
        last_msg_at: parse_datetime(&last_msg_at)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get("id")?;
    let integration_id: String = row.get("integration_id")?;
    let conversation_id: String = row.get("conversation_id")?;
    let direction: String = row.get("direction")?;
    let kind: String = row.get("kind")?;
    let payload: String = row.get("payload")?;
    let created_at: String = row.get("created_at")?;
    Ok(Message {
        id: MessageId::from_provider(id),
        integration_id: IntegrationId::from_uuid(parse_uuid(&integration_id)?),
        conversation_id: ConversationId::from_uuid(parse_uuid(&conversation_id)?),
        direction: parse_direction(&direction)?,
        wa_id: row.get("wa_id")?,
        provider_msg_id: row.get("provider_msg_id")?,
        kind: parse_message_kind(&kind)?,
        text: row.get("text")?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        created_at: parse_datetime(&created_at)?,
    })
}

fn row_to_summary(row: &Row<'_>) -> rusqlite::Result<Summary> {
    let conversation_id: String = row.get("conversation_id")?;
    let updated_at: String = row.get("updated_at")?;
    Ok(Summary {
        conversation_id: ConversationId::from_uuid(parse_uuid(&conversation_id)?),
        content: row.get("content")?,
        msg_count_at_snapshot: row.get::<_, i64>("msg_count_at_snapshot")? as u32,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_schedule(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    let tenant_id: String = row.get("tenant_id")?;
    let frequency: String = row.get("frequency")?;
    let last_sent: Option<String> = row.get("last_sent")?;
    Ok(Schedule {
        tenant_id: TenantId::from_uuid(parse_uuid(&tenant_id)?),
        frequency: parse_frequency(&frequency)?,
        is_active: row.get::<_, i64>("is_active")? != 0,
        last_sent: last_sent.map(|s| parse_datetime(&s)).transpose()?,
    })
}

#[async_trait]
impl TenantStorePort for SqliteStore {
    async fn create(&self, tenant: &Tenant) -> Result<(), ApplicationError> {
        let tenant = tenant.clone();
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, name) VALUES (:id, :name)",
                named_params! { ":id": tenant.id.to_string(), ":name": tenant.name },
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: TenantId) -> Result<Option<Tenant>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT id, name FROM tenants WHERE id = :id",
                named_params! { ":id": id.to_string() },
                row_to_tenant,
            )
            .optional()
        })
        .await
    }

    async fn list(&self) -> Result<Vec<Tenant>, ApplicationError> {
        with_conn(&self.pool, |conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM tenants ORDER BY name")?;
            let tenants = stmt.query_map([], row_to_tenant)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tenants)
        })
        .await
    }

    async fn get_llm_config(&self, tenant_id: TenantId) -> Result<Option<LlmConfig>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT tenant_id, api_key_sealed, model, temperature, max_tokens
                 FROM llm_configs WHERE tenant_id = :tenant_id",
                named_params! { ":tenant_id": tenant_id.to_string() },
                row_to_llm_config,
            )
            .optional()
        })
        .await
    }

    async fn upsert_llm_config(&self, config: &LlmConfig) -> Result<(), ApplicationError> {
        let config = config.clone();
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "INSERT INTO llm_configs (tenant_id, api_key_sealed, model, temperature, max_tokens)
                 VALUES (:tenant_id, :api_key_sealed, :model, :temperature, :max_tokens)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                    api_key_sealed = excluded.api_key_sealed,
                    model = excluded.model,
                    temperature = excluded.temperature,
                    max_tokens = excluded.max_tokens",
                named_params! {
                    ":tenant_id": config.tenant_id.to_string(),
                    ":api_key_sealed": config.api_key_sealed,
                    ":model": config.model.to_string(),
                    ":temperature": config.temperature,
                    ":max_tokens": i64::from(config.max_tokens),
                },
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl IntegrationStorePort for SqliteStore {
    async fn upsert(&self, integration: &Integration) -> Result<(), ApplicationError> {
        let integration = integration.clone();
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "INSERT INTO integrations (
                    id, tenant_id, mode, provider_key_sealed, tester_msisdn,
                    client_context, project_context, custom_instructions, created_at, updated_at
                 ) VALUES (
                    :id, :tenant_id, :mode, :provider_key_sealed, :tester_msisdn,
                    :client_context, :project_context, :custom_instructions, :created_at, :updated_at
                 )
                 ON CONFLICT(tenant_id, mode) DO UPDATE SET
                    provider_key_sealed = excluded.provider_key_sealed,
                    tester_msisdn = excluded.tester_msisdn,
                    client_context = excluded.client_context,
                    project_context = excluded.project_context,
                    custom_instructions = excluded.custom_instructions,
                    updated_at = excluded.updated_at",
                named_params! {
                    ":id": integration.id.to_string(),
                    ":tenant_id": integration.tenant_id.to_string(),
                    ":mode": integration.mode.to_string(),
                    ":provider_key_sealed": integration.provider_key_sealed,
                    ":tester_msisdn": integration.tester_msisdn,
                    ":client_context": integration.client_context,
                    ":project_context": integration.project_context,
                    ":custom_instructions": integration.custom_instructions,
                    ":created_at": integration.created_at.to_rfc3339(),
                    ":updated_at": integration.updated_at.to_rfc3339(),
                },
            )?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: IntegrationId) -> Result<Option<Integration>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM integrations WHERE id = :id",
                named_params! { ":id": id.to_string() },
                row_to_integration,
            )
            .optional()
        })
        .await
    }

    async fn get_by_tenant_and_mode(
        &self,
        tenant_id: TenantId,
        mode: IntegrationMode,
    ) -> Result<Option<Integration>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM integrations WHERE tenant_id = :tenant_id AND mode = :mode",
                named_params! { ":tenant_id": tenant_id.to_string(), ":mode": mode.to_string() },
                row_to_integration,
            )
            .optional()
        })
        .await
    }

    async fn find_by_tester(&self, msisdn_variants: &[String]) -> Result<Option<Integration>, ApplicationError> {
        let variants = msisdn_variants.to_vec();
        with_conn(&self.pool, move |conn| {
            for variant in &variants {
                let found = conn
                    .query_row(
                        "SELECT * FROM integrations WHERE tester_msisdn = :variant",
                        named_params! { ":variant": variant },
                        row_to_integration,
                    )
                    .optional()?;
                if found.is_some() {
                    return Ok(found);
                }
            }
            Ok(None)
        })
        .await
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Integration>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM integrations WHERE tenant_id = :tenant_id")?;
            let rows = stmt
                .query_map(named_params! { ":tenant_id": tenant_id.to_string() }, row_to_integration)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[async_trait]
impl ConversationStorePort for SqliteStore {
    async fn open_or_create(
        &self,
        integration_id: IntegrationId,
        wa_id: &str,
        started_by: StartedBy,
    ) -> Result<(Conversation, bool), ApplicationError> {
        let wa_id = wa_id.to_string();
        with_conn(&self.pool, move |conn| {
            let mut txn = conn.transaction()?;
            txn.set_drop_behavior(rusqlite::DropBehavior::Commit);

            let existing = txn
                .query_row(
                    "SELECT * FROM conversations
                     WHERE integration_id = :integration_id AND wa_id = :wa_id AND status != 'closed'
                     ORDER BY started_at DESC LIMIT 1",
                    named_params! { ":integration_id": integration_id.to_string(), ":wa_id": wa_id },
                    row_to_conversation,
                )
                .optional()?;

            if let Some(conversation) = existing {
                return Ok((conversation, false));
            }

            let conversation = Conversation::open(integration_id, wa_id.clone(), started_by);
            txn.execute(
                "INSERT INTO conversations (id, integration_id, wa_id, started_by, status, started_at, last_msg_at)
                 VALUES (:id, :integration_id, :wa_id, :started_by, :status, :started_at, :last_msg_at)",
                named_params! {
                    ":id": conversation.id.to_string(),
                    ":integration_id": conversation.integration_id.to_string(),
                    ":wa_id": conversation.wa_id,
                    ":started_by": started_by_str(conversation.started_by),
                    ":status": conversation_status_str(conversation.status),
                    ":started_at": conversation.started_at.to_rfc3339(),
                    ":last_msg_at": conversation.last_msg_at.to_rfc3339(),
                },
            )?;
            Ok((conversation, true))
        })
        .await
    }

    async fn get(&self, id: ConversationId) -> Result<Option<Conversation>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM conversations WHERE id = :id",
                named_params! { ":id": id.to_string() },
                row_to_conversation,
            )
            .optional()
        })
        .await
    }

    async fn get_latest_by_wa_id(&self, wa_id: &str) -> Result<Option<Conversation>, ApplicationError> {
        let wa_id = wa_id.to_string();
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM conversations WHERE wa_id = :wa_id ORDER BY last_msg_at DESC LIMIT 1",
                named_params! { ":wa_id": wa_id },
                row_to_conversation,
            )
            .optional()
        })
        .await
    }

    async fn update_status(&self, id: ConversationId, status: ConversationStatus) -> Result<(), ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "UPDATE conversations SET status = :status WHERE id = :id",
                named_params! { ":status": conversation_status_str(status), ":id": id.to_string() },
            )?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> Result<(), ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "UPDATE conversations SET last_msg_at = :at WHERE id = :id AND last_msg_at < :at",
                named_params! { ":at": at.to_rfc3339(), ":id": id.to_string() },
            )?;
            Ok(())
        })
        .await
    }

    async fn list_evaluable_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<Conversation>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.* FROM conversations c
                 JOIN integrations i ON i.id = c.integration_id
                 WHERE i.tenant_id = :tenant_id
                   AND c.status IN ('open', 'continue', 'schedule_later', 'evaluating')",
            )?;
            let rows = stmt
                .query_map(named_params! { ":tenant_id": tenant_id.to_string() }, row_to_conversation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn list_stuck_evaluating(&self, older_than: DateTime<Utc>) -> Result<Vec<Conversation>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM conversations WHERE status = 'evaluating' AND last_msg_at < :older_than",
            )?;
            let rows = stmt
                .query_map(named_params! { ":older_than": older_than.to_rfc3339() }, row_to_conversation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn most_recent_dispatch_eligible(
        &self,
        integration_id: IntegrationId,
    ) -> Result<Option<Conversation>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM conversations
                 WHERE integration_id = :integration_id
                   AND status IN ('open', 'schedule_later', 'evaluating')
                 ORDER BY last_msg_at DESC LIMIT 1",
                named_params! { ":integration_id": integration_id.to_string() },
                row_to_conversation,
            )
            .optional()
        })
        .await
    }
}

fn started_by_str(started_by: StartedBy) -> &'static str {
    match started_by {
        StartedBy::Admin => "admin",
        StartedBy::Contact => "contact",
        StartedBy::System => "system",
    }
}

#[async_trait]
impl MessageStorePort for SqliteStore {
    async fn append_inbound(
        &self,
        integration_id: IntegrationId,
        conversation_id: ConversationId,
        wa_id: &str,
        provider_msg_id: &str,
        kind: MessageKind,
        text: &str,
        payload: serde_json::Value,
    ) -> Result<(Message, bool), ApplicationError> {
        let wa_id = wa_id.to_string();
        let provider_msg_id = provider_msg_id.to_string();
        let text = text.to_string();
        with_conn(&self.pool, move |conn| {
            let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if !provider_msg_id.is_empty() {
                let existing = txn
                    .query_row(
                        "SELECT * FROM messages WHERE integration_id = :integration_id AND provider_msg_id = :provider_msg_id",
                        named_params! { ":integration_id": integration_id.to_string(), ":provider_msg_id": provider_msg_id },
                        row_to_message,
                    )
                    .optional()?;
                if let Some(message) = existing {
                    return Ok((message, false));
                }
            }

            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();
            txn.execute(
                "INSERT INTO messages (
                    id, integration_id, conversation_id, direction, wa_id, provider_msg_id, kind, text, payload, created_at
                 ) VALUES (
                    :id, :integration_id, :conversation_id, 'in', :wa_id, :provider_msg_id, :kind, :text, :payload, :created_at
                 )",
                named_params! {
                    ":id": id,
                    ":integration_id": integration_id.to_string(),
                    ":conversation_id": conversation_id.to_string(),
                    ":wa_id": wa_id,
                    ":provider_msg_id": provider_msg_id,
                    ":kind": kind.to_string(),
                    ":text": text,
                    ":payload": payload.to_string(),
                    ":created_at": created_at.to_rfc3339(),
                },
            )?;
            txn.commit()?;

            Ok((
                Message {
                    id: MessageId::from_provider(id),
                    integration_id,
                    conversation_id,
                    direction: Direction::In,
                    wa_id,
                    provider_msg_id,
                    kind,
                    text,
                    payload,
                    created_at,
                },
                true,
            ))
        })
        .await
    }

    async fn append_outbound(
        &self,
        integration_id: IntegrationId,
        conversation_id: ConversationId,
        wa_id: &str,
        provider_msg_id: &str,
        kind: MessageKind,
        text: &str,
        payload: serde_json::Value,
    ) -> Result<Message, ApplicationError> {
        let wa_id = wa_id.to_string();
        let provider_msg_id = provider_msg_id.to_string();
        let text = text.to_string();
        with_conn(&self.pool, move |conn| {
            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO messages (
                    id, integration_id, conversation_id, direction, wa_id, provider_msg_id, kind, text, payload, created_at
                 ) VALUES (
                    :id, :integration_id, :conversation_id, 'out', :wa_id, :provider_msg_id, :kind, :text, :payload, :created_at
                 )",
                named_params! {
                    ":id": id,
                    ":integration_id": integration_id.to_string(),
                    ":conversation_id": conversation_id.to_string(),
                    ":wa_id": wa_id,
                    ":provider_msg_id": provider_msg_id,
                    ":kind": kind.to_string(),
                    ":text": text,
                    ":payload": payload.to_string(),
                    ":created_at": created_at.to_rfc3339(),
                },
            )?;
            Ok(Message {
                id: MessageId::from_provider(id),
                integration_id,
                conversation_id,
                direction: Direction::Out,
                wa_id,
                provider_msg_id,
                kind,
                text,
                payload,
                created_at,
            })
        })
        .await
    }

    async fn tail(&self, conversation_id: ConversationId, limit: u32) -> Result<Vec<Message>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM (
                    SELECT * FROM messages WHERE conversation_id = :conversation_id
                    ORDER BY created_at DESC LIMIT :limit
                 ) ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map(
                    named_params! { ":conversation_id": conversation_id.to_string(), ":limit": i64::from(limit) },
                    row_to_message,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn after(&self, conversation_id: ConversationId, offset: u32) -> Result<Vec<Message>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM messages WHERE conversation_id = :conversation_id
                 ORDER BY created_at ASC LIMIT -1 OFFSET :offset",
            )?;
            let rows = stmt
                .query_map(
                    named_params! { ":conversation_id": conversation_id.to_string(), ":offset": i64::from(offset) },
                    row_to_message,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn count(&self, conversation_id: ConversationId) -> Result<u32, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = :conversation_id",
                named_params! { ":conversation_id": conversation_id.to_string() },
                |row| row.get(0),
            )?;
            Ok(count as u32)
        })
        .await
    }

    async fn last(&self, conversation_id: ConversationId) -> Result<Option<Message>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM messages WHERE conversation_id = :conversation_id ORDER BY created_at DESC LIMIT 1",
                named_params! { ":conversation_id": conversation_id.to_string() },
                row_to_message,
            )
            .optional()
        })
        .await
    }
}

#[async_trait]
impl SummaryStorePort for SqliteStore {
    async fn get(&self, conversation_id: ConversationId) -> Result<Option<Summary>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM summaries WHERE conversation_id = :conversation_id",
                named_params! { ":conversation_id": conversation_id.to_string() },
                row_to_summary,
            )
            .optional()
        })
        .await
    }

    async fn upsert(&self, summary: &Summary) -> Result<(), ApplicationError> {
        let summary = summary.clone();
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "INSERT INTO summaries (conversation_id, content, msg_count_at_snapshot, updated_at)
                 VALUES (:conversation_id, :content, :msg_count_at_snapshot, :updated_at)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                    content = excluded.content,
                    msg_count_at_snapshot = excluded.msg_count_at_snapshot,
                    updated_at = excluded.updated_at",
                named_params! {
                    ":conversation_id": summary.conversation_id.to_string(),
                    ":content": summary.content,
                    ":msg_count_at_snapshot": i64::from(summary.msg_count_at_snapshot),
                    ":updated_at": summary.updated_at.to_rfc3339(),
                },
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ScheduleStorePort for SqliteStore {
    async fn get(&self, tenant_id: TenantId) -> Result<Option<Schedule>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM schedules WHERE tenant_id = :tenant_id",
                named_params! { ":tenant_id": tenant_id.to_string() },
                row_to_schedule,
            )
            .optional()
        })
        .await
    }

    async fn upsert(&self, schedule: &Schedule) -> Result<(), ApplicationError> {
        let schedule = schedule.clone();
        with_conn(&self.pool, move |conn| {
            conn.execute(
                "INSERT INTO schedules (tenant_id, frequency, is_active, last_sent)
                 VALUES (:tenant_id, :frequency, :is_active, :last_sent)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                    frequency = excluded.frequency,
                    is_active = excluded.is_active,
                    last_sent = excluded.last_sent",
                named_params! {
                    ":tenant_id": schedule.tenant_id.to_string(),
                    ":frequency": frequency_str(schedule.frequency),
                    ":is_active": i64::from(schedule.is_active),
                    ":last_sent": schedule.last_sent.map(|ts| ts.to_rfc3339()),
                },
            )?;
            Ok(())
        })
        .await
    }

    async fn due_tenants(&self, now: DateTime<Utc>) -> Result<Vec<TenantId>, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM schedules WHERE is_active = 1 AND frequency != 'disabled'")?;
            let schedules = stmt.query_map([], row_to_schedule)?.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(schedules
                .into_iter()
                .filter(|schedule| schedule.is_due(now))
                .map(|schedule| schedule.tenant_id)
                .collect())
        })
        .await
    }

    async fn try_claim_due(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<bool, ApplicationError> {
        with_conn(&self.pool, move |conn| {
            let txn = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(mut schedule) = txn
                .query_row(
                    "SELECT * FROM schedules WHERE tenant_id = :tenant_id",
                    named_params! { ":tenant_id": tenant_id.to_string() },
                    row_to_schedule,
                )
                .optional()?
            else {
                return Ok(false);
            };

            let expected = schedule.last_sent;
            if !schedule.try_mark_sent(expected, now) {
                return Ok(false);
            }

            let updated = txn.execute(
                "UPDATE schedules SET last_sent = :last_sent
                 WHERE tenant_id = :tenant_id AND last_sent IS :expected",
                named_params! {
                    ":last_sent": schedule.last_sent.map(|ts| ts.to_rfc3339()),
                    ":tenant_id": tenant_id.to_string(),
                    ":expected": expected.map(|ts| ts.to_rfc3339()),
                },
            )?;
            txn.commit()?;
            Ok(updated == 1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::persistence::connection::create_pool;

    fn store() -> SqliteStore {
        let pool = create_pool(&DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
            run_migrations: true,
        })
        .unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn tenant_create_then_get_roundtrips() {
        let store = store();
        let tenant = Tenant::new("Acme Corp");
        store.create(&tenant).await.unwrap();
        let fetched = store.get(tenant.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Acme Corp");
    }

    #[tokio::test]
    async fn integration_upsert_replaces_by_tenant_and_mode() {
        let store = store();
        let tenant = Tenant::new("Acme");
        store.create(&tenant).await.unwrap();

        let mut integration = Integration::new(
            tenant.id,
            IntegrationMode::Sandbox,
            vec![1, 2, 3],
            "+10000000000",
            "",
            "",
            "",
        );
        store.upsert(&integration).await.unwrap();

        let first_id = integration.id;
        integration.id = IntegrationId::new();
        integration.tester_msisdn = "+19999999999".to_string();
        store.upsert(&integration).await.unwrap();

        let by_mode = store.get_by_tenant_and_mode(tenant.id, IntegrationMode::Sandbox).await.unwrap().unwrap();
        assert_eq!(by_mode.tester_msisdn, "+19999999999");
        assert_ne!(by_mode.id, first_id);

        let all = store.list_for_tenant(tenant.id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn find_by_tester_tries_each_variant_in_order() {
        let store = store();
        let tenant = Tenant::new("Acme");
        store.create(&tenant).await.unwrap();
        let integration = Integration::new(tenant.id, IntegrationMode::Sandbox, vec![1], "923001234567", "", "", "");
        store.upsert(&integration).await.unwrap();

        let found = store
            .find_by_tester(&["+923001234567".to_string(), "923001234567".to_string()])
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, integration.id);
    }

    #[tokio::test]
    async fn conversation_open_or_create_reuses_non_terminal_conversation() {
        let store = store();
        let integration_id = IntegrationId::new();

        let (first, created_first) = store.open_or_create(integration_id, "+1", StartedBy::Contact).await.unwrap();
        assert!(created_first);

        let (second, created_second) = store.open_or_create(integration_id, "+1", StartedBy::Contact).await.unwrap();
        assert!(!created_second);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn conversation_open_or_create_starts_fresh_after_closed() {
        let store = store();
        let integration_id = IntegrationId::new();

        let (first, _) = store.open_or_create(integration_id, "+1", StartedBy::Contact).await.unwrap();
        store.update_status(first.id, ConversationStatus::Closed).await.unwrap();

        let (second, created) = store.open_or_create(integration_id, "+1", StartedBy::Contact).await.unwrap();
        assert!(created);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn message_append_inbound_dedupes_on_provider_msg_id() {
        let store = store();
        let integration_id = IntegrationId::new();
        let conversation_id = ConversationId::new();

        let (msg1, created1) = store
            .append_inbound(integration_id, conversation_id, "+1", "wamid.1", MessageKind::Text, "hi", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(created1);

        let (msg2, created2) = store
            .append_inbound(integration_id, conversation_id, "+1", "wamid.1", MessageKind::Text, "hi again", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(!created2);
        assert_eq!(msg1.id, msg2.id);
    }

    #[tokio::test]
    async fn message_append_inbound_without_provider_id_never_dedupes() {
        let store = store();
        let integration_id = IntegrationId::new();
        let conversation_id = ConversationId::new();

        let (_, created1) = store
            .append_inbound(integration_id, conversation_id, "+1", "", MessageKind::Text, "a", serde_json::Value::Null)
            .await
            .unwrap();
        let (_, created2) = store
            .append_inbound(integration_id, conversation_id, "+1", "", MessageKind::Text, "b", serde_json::Value::Null)
            .await
            .unwrap();
        assert!(created1);
        assert!(created2);
    }

    #[tokio::test]
    async fn schedule_try_claim_due_wins_exactly_once() {
        let store = store();
        let tenant = Tenant::new("Acme");
        store.create(&tenant).await.unwrap();
        store.upsert(&Schedule::new(tenant.id, domain::Frequency::Minute)).await.unwrap();

        let now = Utc::now();
        assert!(store.try_claim_due(tenant.id, now).await.unwrap());
        assert!(!store.try_claim_due(tenant.id, now).await.unwrap());
    }

    #[tokio::test]
    async fn schedule_due_tenants_excludes_disabled() {
        let store = store();
        let tenant = Tenant::new("Acme");
        store.create(&tenant).await.unwrap();
        store.upsert(&Schedule::new(tenant.id, domain::Frequency::Disabled)).await.unwrap();

        assert!(store.due_tenants(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_upsert_replaces_existing_row() {
        let store = store();
        let conversation_id = ConversationId::new();
        let mut summary = Summary::new(conversation_id, "first pass", 3);
        store.upsert(&summary).await.unwrap();

        summary.content = "second pass".to_string();
        store.upsert(&summary).await.unwrap();

        let fetched = store.get(conversation_id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "second pass");
    }
}
