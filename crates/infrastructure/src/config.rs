//! Application configuration
//!
//! Loaded via the `config` crate layered over environment variables, matching
//! the teacher's `config::Config::builder()` + environment-source pattern.
//! Secrets are wrapped in `secrecy::SecretString` so they never appear in a
//! `Debug` dump.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> String {
    "sales_engineer.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// HTTP server bind configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// WhatsApp provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_whatsapp_base_url")]
    pub base_url: String,
    pub webhook_public_url: String,
}

fn default_whatsapp_base_url() -> String {
    "https://waba-sandbox.360dialog.io".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            base_url: default_whatsapp_base_url(),
            webhook_public_url: String::new(),
        }
    }
}

/// Default LLM call parameters, used when a tenant has not overridden them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmDefaultsConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
}

fn default_llm_model() -> String {
    "fast".to_string()
}

const fn default_llm_temperature() -> f32 {
    0.5
}

const fn default_llm_max_tokens() -> u32 {
    500
}

fn default_llm_base_url() -> String {
    "https://api.openai.com".to_string()
}

impl Default for LlmDefaultsConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            base_url: default_llm_base_url(),
        }
    }
}

/// The scheduler's tick cadence and the worker pool that drains its jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Threshold (minutes) past which a stuck `EVALUATING` conversation is
    /// swept back to its prior status on startup.
    #[serde(default = "default_stuck_threshold_minutes")]
    pub stuck_evaluating_threshold_minutes: i64,
}

const fn default_tick_seconds() -> u64 {
    60
}

const fn default_worker_pool_size() -> usize {
    4
}

const fn default_stuck_threshold_minutes() -> i64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            worker_pool_size: default_worker_pool_size(),
            stuck_evaluating_threshold_minutes: default_stuck_threshold_minutes(),
        }
    }
}

/// Operator-endpoint authentication and rate limiting
#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Bearer token required on the operator endpoints (sandbox connect,
    /// send-text, conversation lookups). Absent disables auth entirely,
    /// which is only appropriate for local development.
    #[serde(default)]
    pub admin_api_key: Option<SecretString>,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

const fn default_rate_limit_per_minute() -> u32 {
    60
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "[redacted]"))
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            admin_api_key: None,
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

/// Master configuration, assembled from the sub-configs above plus the
/// process-wide master encryption key.
#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub whatsapp: WhatsAppConfig,
    pub llm: LlmDefaultsConfig,
    pub scheduler: SchedulerConfig,
    pub security: SecurityConfig,
    /// 32-byte master key for the `SecretBox` AEAD cipher. Absent means the
    /// box runs in `is_enabled() == false` mode and every `open`/`seal`
    /// fails with `ErrCryptoNotReady`.
    pub master_encryption_key: Option<SecretString>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("whatsapp", &self.whatsapp)
            .field("llm", &self.llm)
            .field("scheduler", &self.scheduler)
            .field("security", &self.security)
            .field("master_encryption_key", &self.master_encryption_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Errors raised while assembling [`AppConfig`] from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
    #[error("MASTER_ENCRYPTION_KEY must decode to exactly 32 bytes, got {0}")]
    InvalidMasterKeyLength(usize),
    #[error("MASTER_ENCRYPTION_KEY is not valid hex: {0}")]
    InvalidMasterKeyHex(String),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default)]
    whatsapp: WhatsAppConfig,
    #[serde(default)]
    llm: LlmDefaultsConfig,
    #[serde(default)]
    scheduler: SchedulerConfig,
    #[serde(default)]
    security: SecurityConfig,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            llm: LlmDefaultsConfig::default(),
            scheduler: SchedulerConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, layered the way the
    /// teacher's `config::Config::builder()` call does: defaults, then an
    /// optional config file, then environment overrides win.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.bind_addr", default_bind_addr())?
            .set_default("database.path", default_db_path())?
            .set_default("database.max_connections", i64::from(default_max_connections()))?
            .set_default("database.run_migrations", true)?
            .set_default("whatsapp.base_url", default_whatsapp_base_url())?
            .set_default("whatsapp.webhook_public_url", "")?
            .set_default("llm.model", default_llm_model())?
            .set_default("llm.temperature", f64::from(default_llm_temperature()))?
            .set_default("llm.max_tokens", i64::from(default_llm_max_tokens()))?
            .set_default("llm.base_url", default_llm_base_url())?
            .set_default("scheduler.tick_seconds", i64::try_from(default_tick_seconds()).unwrap_or(60))?
            .set_default("scheduler.worker_pool_size", i64::try_from(default_worker_pool_size()).unwrap_or(4))?
            .set_default(
                "scheduler.stuck_evaluating_threshold_minutes",
                default_stuck_threshold_minutes(),
            )?
            .set_default(
                "security.rate_limit_per_minute",
                i64::from(default_rate_limit_per_minute()),
            )?
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let raw: RawConfig = builder.build()?.try_deserialize().unwrap_or_default();

        let master_encryption_key = match std::env::var("MASTER_ENCRYPTION_KEY") {
            Ok(hex_key) if !hex_key.is_empty() => {
                let bytes = decode_hex(&hex_key).map_err(ConfigError::InvalidMasterKeyHex)?;
                if bytes.len() != 32 {
                    return Err(ConfigError::InvalidMasterKeyLength(bytes.len()));
                }
                Some(SecretString::from(hex_key))
            },
            _ => None,
        };

        let database = if let Ok(path) = std::env::var("DATABASE_PATH") {
            DatabaseConfig { path, ..raw.database }
        } else {
            raw.database
        };

        let server = if let Ok(bind_addr) = std::env::var("HTTP_BIND_ADDR") {
            ServerConfig { bind_addr }
        } else {
            raw.server
        };

        let admin_api_key = match std::env::var("ADMIN_API_KEY") {
            Ok(key) if !key.is_empty() => Some(SecretString::from(key)),
            _ => raw.security.admin_api_key,
        };
        let security = SecurityConfig {
            admin_api_key,
            rate_limit_per_minute: raw.security.rate_limit_per_minute,
        };

        Ok(Self {
            server,
            database,
            whatsapp: raw.whatsapp,
            llm: raw.llm,
            scheduler: raw.scheduler,
            security,
            master_encryption_key,
        })
    }

    /// Decode the master key into raw bytes, if configured
    pub fn master_key_bytes(&self) -> Option<Vec<u8>> {
        self.master_encryption_key
            .as_ref()
            .and_then(|k| decode_hex(k.expose_secret()).ok())
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex string must have an even length".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}
