//! Session-scoped cipher.
//!
//! The key is generated lazily on first use and lives as long as the
//! `SessionCipher`. Its raw bytes are zeroized right after the AES key
//! schedule is built and are never observable afterwards: there is no
//! accessor, no `Clone`, and no serialization.

use std::fmt;

use aes_gcm::{Aes256Gcm, KeyInit};
use tokio::sync::OnceCell;
use zeroize::Zeroize;

use crate::aes_gcm::{open, seal};
use crate::codec::{decode_base64, decode_utf8, encode_base64};
use crate::error::CryptoError;
use crate::types::AES_KEY_LENGTH;

/// Non-extractable AES-256-GCM key.
struct SessionKey {
    cipher: Aes256Gcm,
}

impl SessionKey {
    fn generate() -> Result<Self, CryptoError> {
        let mut raw = [0u8; AES_KEY_LENGTH];
        getrandom::getrandom(&mut raw).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        let cipher = Aes256Gcm::new_from_slice(&raw)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()));
        raw.zeroize();
        Ok(Self { cipher: cipher? })
    }
}

/// Encrypts and decrypts values under one per-session key.
///
/// Envelopes are `base64([IV:12][ciphertext+tag])`. An envelope produced by
/// one `SessionCipher` fails authentication under any other.
#[derive(Default)]
pub struct SessionCipher {
    key: OnceCell<SessionKey>,
}

impl SessionCipher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session key has materialised yet.
    pub fn is_ready(&self) -> bool {
        self.key.initialized()
    }

    /// Concurrent first callers all await the same initialisation.
    async fn key(&self) -> Result<&SessionKey, CryptoError> {
        self.key
            .get_or_try_init(|| async { SessionKey::generate() })
            .await
    }

    /// Seal a UTF-8 string under a fresh IV and return the base64 envelope.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let key = self.key().await?;
        let sealed = seal(&key.cipher, plaintext.as_bytes())?;
        Ok(encode_base64(&sealed))
    }

    /// Open a base64 envelope and return the plaintext string.
    pub async fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let key = self.key().await?;
        let sealed = decode_base64(envelope)?;
        let plaintext = open(&key.cipher, &sealed)?;
        decode_utf8(plaintext)
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCipher")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
