//! HTTP middleware components
//!
//! Cross-cutting concerns applied as tower layers around the router.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{ApiKeyAuth, ApiKeyAuthLayer};
pub use rate_limit::{RateLimiter, RateLimiterConfig, RateLimiterLayer, RateLimiterState, spawn_cleanup_task};
pub use request_id::{RequestId, RequestIdLayer};
pub use security_headers::SecurityHeadersLayer;
