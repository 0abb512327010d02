//! HTTP presentation layer
//!
//! The thin transport edge: webhook ingestion, the operator endpoints, and
//! the tower middleware stack (auth, rate limiting, request id, security
//! headers) wrapped around the router built in [`routes`].

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use middleware::{
    ApiKeyAuthLayer, RateLimiterConfig, RateLimiterLayer, RequestId, RequestIdLayer, SecurityHeadersLayer,
    spawn_cleanup_task,
};
pub use routes::create_router;
pub use state::AppState;
