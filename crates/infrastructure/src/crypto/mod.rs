//! `SecretBox` (C2) - authenticated encryption for provider/LLM API keys at rest
//!
//! Keeps the XChaCha20-Poly1305 nonce-prepended-to-ciphertext layout the
//! teacher's `ChaChaEncryptionAdapter` uses, adapted to the narrower
//! `seal(str)->bytes`/`open(bytes)->str` contract and its two distinct
//! failure modes.

use application::{ApplicationError, SecretBoxPort};
use async_trait::async_trait;
use chacha20poly1305::{
    XChaCha20Poly1305,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};
use tracing::{instrument, warn};

const NONCE_SIZE: usize = 24;
const KEY_SIZE: usize = 32;

/// `SecretBoxPort` adapter backed by XChaCha20-Poly1305
pub struct ChaChaSecretBox {
    cipher: Option<XChaCha20Poly1305>,
}

impl std::fmt::Debug for ChaChaSecretBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaChaSecretBox")
            .field("configured", &self.cipher.is_some())
            .finish()
    }
}

impl ChaChaSecretBox {
    /// Construct a box keyed by the master key. `None` yields a box whose
    /// every operation fails with `CryptoNotReady`, matching an unconfigured
    /// deployment rather than panicking at startup.
    pub fn new(key: Option<&[u8]>) -> Result<Self, ApplicationError> {
        let cipher = match key {
            None => None,
            Some(key) if key.len() == KEY_SIZE => Some(
                XChaCha20Poly1305::new_from_slice(key)
                    .map_err(|e| ApplicationError::Config(format!("invalid master key: {e}")))?,
            ),
            Some(key) => {
                return Err(ApplicationError::Config(format!(
                    "master key must be {KEY_SIZE} bytes, got {}",
                    key.len()
                )));
            },
        };
        Ok(Self { cipher })
    }

    /// Generate a new random 32-byte key, for bootstrapping local deployments
    #[must_use]
    pub fn generate_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        key
    }
}

#[async_trait]
impl SecretBoxPort for ChaChaSecretBox {
    #[instrument(skip(self, plaintext))]
    async fn seal(&self, plaintext: &str) -> Result<Vec<u8>, ApplicationError> {
        let cipher = self.cipher.as_ref().ok_or(ApplicationError::CryptoNotReady)?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        let nonce_arr = chacha20poly1305::XNonce::from_slice(&nonce);

        let ciphertext = cipher
            .encrypt(nonce_arr, plaintext.as_bytes())
            .map_err(|_| ApplicationError::Internal("seal failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    #[instrument(skip(self, ciphertext))]
    async fn open(&self, ciphertext: &[u8]) -> Result<String, ApplicationError> {
        let cipher = self.cipher.as_ref().ok_or(ApplicationError::CryptoNotReady)?;

        if ciphertext.len() < NONCE_SIZE {
            return Err(ApplicationError::CryptoTamper("ciphertext too short".to_string()));
        }
        let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
        let nonce = chacha20poly1305::XNonce::from_slice(nonce_bytes);

        let plaintext = cipher.decrypt(nonce, encrypted).map_err(|_| {
            warn!("secret box authentication failed");
            ApplicationError::CryptoTamper("authentication failed".to_string())
        })?;

        String::from_utf8(plaintext).map_err(|_| ApplicationError::CryptoTamper("decrypted payload was not valid utf-8".to_string()))
    }

    fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ChaChaSecretBox {
        ChaChaSecretBox::new(Some(&ChaChaSecretBox::generate_key())).unwrap()
    }

    #[tokio::test]
    async fn seal_then_open_roundtrips() {
        let secret_box = configured();
        let sealed = secret_box.seal("super-secret-api-key").await.unwrap();
        let opened = secret_box.open(&sealed).await.unwrap();
        assert_eq!(opened, "super-secret-api-key");
    }

    #[tokio::test]
    async fn tampered_ciphertext_fails_with_crypto_tamper() {
        let secret_box = configured();
        let mut sealed = secret_box.seal("key").await.unwrap();
        *sealed.last_mut().unwrap() ^= 0xFF;

        let err = secret_box.open(&sealed).await.unwrap_err();
        assert!(matches!(err, ApplicationError::CryptoTamper(_)));
    }

    #[tokio::test]
    async fn unconfigured_box_fails_with_crypto_not_ready() {
        let secret_box = ChaChaSecretBox::new(None).unwrap();
        assert!(!secret_box.is_enabled());

        let err = secret_box.seal("anything").await.unwrap_err();
        assert!(matches!(err, ApplicationError::CryptoNotReady));

        let err = secret_box.open(&[0u8; 32]).await.unwrap_err();
        assert!(matches!(err, ApplicationError::CryptoNotReady));
    }

    #[tokio::test]
    async fn two_seals_of_same_plaintext_differ() {
        let secret_box = configured();
        let a = secret_box.seal("same").await.unwrap();
        let b = secret_box.seal("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(ChaChaSecretBox::new(Some(&[0u8; 16])).is_err());
    }
}
