use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Truncated envelope, bad tag, or an envelope sealed under another session key.
    #[error("Envelope failed authentication: {0}")]
    AuthenticationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Session key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid base64 envelope: {0}")]
    InvalidEncoding(String),

    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}

impl CryptoError {
    /// True when the failure came from the AEAD integrity check rather than
    /// from framing or encoding.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, CryptoError::AuthenticationFailed(_))
    }
}
