//! AES-256-GCM envelope framing.
//!
//! Envelope format: [12 bytes: IV][N bytes: ciphertext + 16-byte tag]
//! No version byte and no AAD: envelopes never leave the process that sealed them.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::CryptoError;
use crate::types::{AES_GCM_IV_LENGTH, MIN_ENVELOPE_LENGTH};

/// Generate a random 12-byte IV for AES-GCM.
pub fn generate_iv() -> Result<[u8; AES_GCM_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; AES_GCM_IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

/// Seal `plaintext` under a fresh IV.
///
/// Returns: [IV:12B][ciphertext+tag]
pub fn seal(cipher: &Aes256Gcm, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let iv = generate_iv()?;
    let nonce = Nonce::from_slice(&iv);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(AES_GCM_IV_LENGTH + ciphertext.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Open an envelope produced by [`seal`] (expects [IV:12][ciphertext+tag]).
pub fn open(cipher: &Aes256Gcm, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < MIN_ENVELOPE_LENGTH {
        return Err(CryptoError::AuthenticationFailed(format!(
            "envelope too short: {} bytes, need at least {}",
            envelope.len(),
            MIN_ENVELOPE_LENGTH
        )));
    }
    let (iv, ciphertext) = envelope.split_at(AES_GCM_IV_LENGTH);
    let nonce = Nonce::from_slice(iv);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::AuthenticationFailed(e.to_string()))
}
