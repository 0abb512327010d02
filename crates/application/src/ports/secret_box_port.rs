//! SecretBox port - symmetric authenticated encryption for stored secrets
//!
//! Provider API keys and LLM API keys are only ever persisted as ciphertext
//! produced by [`SecretBoxPort::seal`]. `open` must never surface plaintext
//! when the ciphertext has been tampered with or the master key is missing;
//! both failure modes are reported as distinct [`ApplicationError`] variants
//! so callers can tell "not configured" from "tampered" without parsing text.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for sealing and opening secret material at rest
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretBoxPort: Send + Sync {
    /// Seal plaintext into authenticated ciphertext
    async fn seal(&self, plaintext: &str) -> Result<Vec<u8>, ApplicationError>;

    /// Open ciphertext back into plaintext. Fails with
    /// `ApplicationError::CryptoTamper` if authentication fails, or
    /// `ApplicationError::CryptoNotReady` if no master key is configured.
    async fn open(&self, ciphertext: &[u8]) -> Result<String, ApplicationError>;

    /// Whether a master key is configured
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A pass-through implementation for tests and local development where no
/// master key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSecretBox;

#[async_trait]
impl SecretBoxPort for NoOpSecretBox {
    async fn seal(&self, plaintext: &str) -> Result<Vec<u8>, ApplicationError> {
        Ok(plaintext.as_bytes().to_vec())
    }

    async fn open(&self, ciphertext: &[u8]) -> Result<String, ApplicationError> {
        String::from_utf8(ciphertext.to_vec())
            .map_err(|e| ApplicationError::CryptoTamper(e.to_string()))
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
