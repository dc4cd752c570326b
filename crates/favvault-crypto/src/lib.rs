//! Cipher boundary for favvault: one non-extractable AES-256-GCM key per
//! session, IV-prefixed envelopes, and the base64 codec used to store them.

pub mod aes_gcm;
pub mod codec;
pub mod error;
pub mod session;
pub mod types;

pub use crate::aes_gcm::{generate_iv, open, seal};
pub use codec::{decode_base64, decode_utf8, encode_base64};
pub use error::CryptoError;
pub use session::SessionCipher;
pub use types::{AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH, MIN_ENVELOPE_LENGTH};
