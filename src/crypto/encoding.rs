//! Text encodings for cipher envelopes. New ciphertext is written as padded
//! base64; decoding also accepts the legacy lowercase-hex form and picks the
//! scheme automatically so old configuration files keep loading.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Encodes bytes as lowercase hex, two characters per byte, no separators.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes a hex string into bytes. Empty or odd-length input yields an
/// empty vector rather than an error; callers that need strictness validate
/// with [`is_hex`] first.
pub fn from_hex(text: &str) -> Vec<u8> {
    if text.is_empty() || text.len() % 2 != 0 {
        return Vec::new();
    }
    hex::decode(text).unwrap_or_default()
}

/// Returns `true` when the string is non-empty, of even length, and made of
/// hex digits only. This is the detector used by [`decode`].
pub fn is_hex(text: &str) -> bool {
    !text.is_empty() && text.len() % 2 == 0 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Encodes bytes with the default text encoding (standard padded base64).
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a string produced by [`encode`] or by the legacy hex encoding.
/// A string that [`is_hex`] accepts is decoded as hex; everything else is
/// treated as base64.
pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if is_hex(text) {
        return Ok(from_hex(text));
    }
    STANDARD.decode(text)
}
