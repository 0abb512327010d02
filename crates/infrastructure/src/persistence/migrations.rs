//! Schema migrations for the conversation engine's SQLite store

use rusqlite::Connection;
use tracing::{debug, info};

use super::connection::DatabaseError;

const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(from_version = current_version, to_version = SCHEMA_VERSION, "running database migrations");
        if current_version < 1 {
            migrate_v1(conn)?;
        }
        set_schema_version(conn, SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "database migrations complete");
    } else {
        debug!(version = current_version, "database schema is up to date");
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, DatabaseError> {
    conn.execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)", [])?;
    let version: i32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), DatabaseError> {
    debug!("applying migration v1: initial schema");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS llm_configs (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id) ON DELETE CASCADE,
            api_key_sealed BLOB NOT NULL,
            model TEXT NOT NULL CHECK(model IN ('fast', 'accurate', 'extended')),
            temperature REAL NOT NULL,
            max_tokens INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schedules (
            tenant_id TEXT PRIMARY KEY REFERENCES tenants(id) ON DELETE CASCADE,
            frequency TEXT NOT NULL CHECK(frequency IN ('minute', 'daily', 'weekly', 'monthly', 'disabled')),
            is_active INTEGER NOT NULL DEFAULT 1,
            last_sent TEXT
        );

        CREATE TABLE IF NOT EXISTS integrations (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
            mode TEXT NOT NULL CHECK(mode IN ('sandbox', 'prod')),
            provider_key_sealed BLOB NOT NULL,
            tester_msisdn TEXT NOT NULL,
            client_context TEXT NOT NULL DEFAULT '',
            project_context TEXT NOT NULL DEFAULT '',
            custom_instructions TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(tenant_id, mode)
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            integration_id TEXT NOT NULL REFERENCES integrations(id) ON DELETE CASCADE,
            wa_id TEXT NOT NULL,
            started_by TEXT NOT NULL CHECK(started_by IN ('admin', 'contact', 'system')),
            status TEXT NOT NULL CHECK(status IN ('open', 'continue', 'schedule_later', 'evaluating', 'closed')),
            started_at TEXT NOT NULL,
            last_msg_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            integration_id TEXT NOT NULL REFERENCES integrations(id) ON DELETE CASCADE,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            direction TEXT NOT NULL CHECK(direction IN ('in', 'out')),
            wa_id TEXT NOT NULL,
            provider_msg_id TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL,
            text TEXT NOT NULL,
            payload TEXT NOT NULL DEFAULT 'null',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS summaries (
            conversation_id TEXT PRIMARY KEY REFERENCES conversations(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            msg_count_at_snapshot INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_integration_wa
            ON conversations(integration_id, wa_id);
        CREATE INDEX IF NOT EXISTS idx_conversations_status_last_msg
            ON conversations(status, last_msg_at);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_integration_provider_msg_id
            ON messages(integration_id, provider_msg_id) WHERE provider_msg_id != '';
        CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
            ON messages(conversation_id, created_at);
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn run_migrations_creates_all_tables() {
        let conn = test_connection();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        for expected in ["tenants", "llm_configs", "schedules", "integrations", "conversations", "messages", "summaries"] {
            assert!(tables.contains(&expected.to_string()), "missing table {expected}");
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let conn = test_connection();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn integration_mode_uniqueness_is_enforced() {
        let conn = test_connection();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO tenants (id, name) VALUES ('t1', 'Acme')", []).unwrap();
        conn.execute(
            "INSERT INTO integrations (id, tenant_id, mode, provider_key_sealed, tester_msisdn, created_at, updated_at)
             VALUES ('i1', 't1', 'sandbox', x'00', '+1', '2024-01-01', '2024-01-01')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO integrations (id, tenant_id, mode, provider_key_sealed, tester_msisdn, created_at, updated_at)
             VALUES ('i2', 't1', 'sandbox', x'00', '+2', '2024-01-01', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn message_provider_msg_id_uniqueness_excludes_empty_strings() {
        let conn = test_connection();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO tenants (id, name) VALUES ('t1', 'Acme')", []).unwrap();
        conn.execute(
            "INSERT INTO integrations (id, tenant_id, mode, provider_key_sealed, tester_msisdn, created_at, updated_at)
             VALUES ('i1', 't1', 'sandbox', x'00', '+1', '2024-01-01', '2024-01-01')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO conversations (id, integration_id, wa_id, started_by, status, started_at, last_msg_at)
             VALUES ('c1', 'i1', '+1', 'contact', 'open', '2024-01-01', '2024-01-01')",
            [],
        )
        .unwrap();

        for id in ["m1", "m2"] {
            conn.execute(
                "INSERT INTO messages (id, integration_id, conversation_id, direction, wa_id, provider_msg_id, kind, text, created_at)
                 VALUES (?1, 'i1', 'c1', 'out', '+1', '', 'text', 'hi', '2024-01-01')",
                [id],
            )
            .unwrap();
        }

        let result = conn.execute(
            "INSERT INTO messages (id, integration_id, conversation_id, direction, wa_id, provider_msg_id, kind, text, created_at)
             VALUES ('m3', 'i1', 'c1', 'in', '+1', 'wamid.dup', 'text', 'hi', '2024-01-01')",
            [],
        );
        assert!(result.is_ok());

        let result = conn.execute(
            "INSERT INTO messages (id, integration_id, conversation_id, direction, wa_id, provider_msg_id, kind, text, created_at)
             VALUES ('m4', 'i1', 'c1', 'in', '+1', 'wamid.dup', 'text', 'hi', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
