//! SQLite-backed persistence: connection pooling, schema migrations, and the
//! store adapters for every port in `application::ports`.

pub mod connection;
pub mod migrations;
pub mod sqlite_store;

pub use connection::{ConnectionPool, DatabaseError, create_pool};
pub use sqlite_store::SqliteStore;
