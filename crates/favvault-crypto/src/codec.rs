//! Byte/string conversions at the storage boundary.
//!
//! Envelopes are stored as standard (padded) base64 text.

use base64ct::{Base64, Encoding};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Base64 encode bytes with the standard alphabet and padding.
pub fn encode_base64(data: &[u8]) -> String {
    Base64::encode_string(data)
}

/// Base64 decode a string to bytes.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, CryptoError> {
    Base64::decode_vec(s).map_err(|e| CryptoError::InvalidEncoding(e.to_string()))
}

/// Take ownership of decrypted bytes as a UTF-8 string.
///
/// Rejected bytes are zeroized before the error is returned.
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String, CryptoError> {
    String::from_utf8(bytes).map_err(|e| {
        e.into_bytes().zeroize();
        CryptoError::InvalidUtf8
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"hello world.";
        let encoded = encode_base64(data);
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn standard_alphabet_with_padding() {
        // 0xfb 0xff produce '+' and '/' in the standard alphabet
        assert_eq!(encode_base64(&[0xfb, 0xff]), "+/8=");
        assert_eq!(encode_base64(b"ab"), "YWI=");
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_base64("not*base64").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidEncoding(_)));
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(decode_base64("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn utf8_decode() {
        assert_eq!(decode_utf8("héllo".as_bytes().to_vec()).unwrap(), "héllo");
        assert!(matches!(
            decode_utf8(vec![0xff, 0xfe]),
            Err(CryptoError::InvalidUtf8)
        ));
    }
}
