//! Application-level errors
//!
//! The taxonomy below is the contract every port and service reports
//! through; `presentation_http::ApiError` maps each variant to an HTTP
//! response at the transport edge, and jobs log it without aborting the
//! worker that raised it.

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Required configuration (master key, webhook URL, LLM config) is missing
    #[error("configuration error: {0}")]
    Config(String),

    /// A sealed secret failed authentication on open — the ciphertext was tampered with
    #[error("secret failed to decrypt (tampered or wrong key): {0}")]
    CryptoTamper(String),

    /// SecretBox has no master key configured
    #[error("encryption is not configured")]
    CryptoNotReady,

    /// Provider rejected credentials
    #[error("provider authentication failed: {0}")]
    Auth(String),

    /// Provider rejected the operation as not permitted for this account
    #[error("provider permission denied: {0}")]
    Permission(String),

    /// Provider endpoint does not exist
    #[error("provider endpoint not found: {0}")]
    Endpoint(String),

    /// Provider returned a non-2xx status not covered by a more specific variant
    #[error("provider returned HTTP {0}")]
    Http(u16),

    /// The LLM call failed outright (network/timeout/non-2xx). `classify`
    /// never surfaces this — it degrades to a safe default instead.
    #[error("LLM call failed: {0}")]
    Llm(String),

    /// An inbound message matched no known integration
    #[error("no integration routes to {0}")]
    RoutingMiss(String),

    /// An inbound message collided with an existing at-most-once key
    #[error("duplicate message, already stored")]
    Dup,

    /// A domain invariant was violated at a boundary the domain layer itself
    /// cannot enforce (e.g. a uniqueness constraint the store must check)
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal error with no more specific category
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether a caller could plausibly succeed by retrying as-is. None of
    /// this taxonomy is retried automatically (see `WhatsAppGateway`/`LLMGateway`
    /// contracts, which perform no retries); this is informational for callers
    /// that want to decide for themselves.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Llm(_))
    }

    /// True for the encryption-layer failure modes that must never surface
    /// plaintext or ciphertext to a caller.
    pub const fn is_crypto_failure(&self) -> bool {
        matches!(self, Self::CryptoTamper(_) | Self::CryptoNotReady)
    }

    /// A short machine-readable category, used by the HTTP edge's error body.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Config(_) => "config",
            Self::CryptoTamper(_) => "crypto_tamper",
            Self::CryptoNotReady => "crypto_not_ready",
            Self::Auth(_) => "auth",
            Self::Permission(_) => "permission",
            Self::Endpoint(_) => "endpoint",
            Self::Http(_) => "http",
            Self::Llm(_) => "llm",
            Self::RoutingMiss(_) => "routing_miss",
            Self::Dup => "dup",
            Self::Invariant(_) => "invariant",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_is_retryable() {
        assert!(ApplicationError::Http(503).is_retryable());
    }

    #[test]
    fn auth_error_is_not_retryable() {
        assert!(!ApplicationError::Auth("bad key".to_string()).is_retryable());
    }

    #[test]
    fn crypto_tamper_is_a_crypto_failure() {
        assert!(ApplicationError::CryptoTamper("bad tag".to_string()).is_crypto_failure());
        assert!(ApplicationError::CryptoNotReady.is_crypto_failure());
        assert!(!ApplicationError::Dup.is_crypto_failure());
    }

    #[test]
    fn category_matches_variant() {
        assert_eq!(ApplicationError::Dup.category(), "dup");
        assert_eq!(ApplicationError::Http(404).category(), "http");
        assert_eq!(ApplicationError::CryptoNotReady.category(), "crypto_not_ready");
    }

    #[test]
    fn domain_error_converts_to_application_error() {
        let domain_err = DomainError::InvalidPhoneNumber("bad".to_string());
        let app_err: ApplicationError = domain_err.into();
        assert!(matches!(app_err, ApplicationError::Domain(_)));
    }

    #[test]
    fn error_messages_render() {
        assert_eq!(ApplicationError::Http(500).to_string(), "provider returned HTTP 500");
        assert_eq!(ApplicationError::Dup.to_string(), "duplicate message, already stored");
    }
}
