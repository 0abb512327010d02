#![forbid(unsafe_code)]
//! Infrastructure layer - adapters for external systems
//!
//! Implements the ports defined in the application layer: configuration
//! loading, the `SecretBox` encryption adapter, the SQLite-backed stores, and
//! the job queue / scheduler tick / startup recovery that drive the worker
//! pool. The WhatsApp and LLM gateway adapters live in their own crates
//! (`integration_whatsapp`, `ai_core`) and implement their ports directly.

pub mod config;
pub mod crypto;
pub mod persistence;
pub mod scheduling;

pub use config::{AppConfig, ConfigError, SecurityConfig};
pub use crypto::ChaChaSecretBox;
pub use persistence::{ConnectionPool, DatabaseError, SqliteStore, create_pool};
pub use scheduling::{Job, WorkerPool, sweep_stuck_evaluating};
