//! Binary cipher envelope, the self-describing container every encrypted
//! value travels in. Packing the key size, IV, and (for the passphrase
//! variant) the key-derivation salt next to the ciphertext means a value can
//! be decrypted later with nothing but the secret itself; the envelope
//! round-trips through ordinary text config fields with no side channel.
//!
//! Layout, little-endian key size:
//!
//! | Field      | Size          | Notes                                 |
//! |------------|---------------|---------------------------------------|
//! | len        | 1             | always 4                              |
//! | key_size   | 4 (i32 LE)    | cipher key size in bits               |
//! | len        | 1             | IV length                             |
//! | iv         | 0..=255       |                                       |
//! | len        | 1             | salt length (salted variant only)     |
//! | salt       | 0..=255       | salted variant only                   |
//! | ciphertext | rest          | unprefixed, always last               |
//!
//! Whether a salt block is present is static knowledge of whichever cipher
//! variant produced the envelope; it is not flagged in the bytes.

use std::io::Read;

use thiserror::Error;

/// Size of the single-byte length prefix written before every field except
/// the trailing ciphertext. Field generators must stay within it.
pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope field `{0}` is longer than 255 bytes")]
    FieldTooLong(&'static str),
    #[error("envelope truncated while reading `{0}`")]
    Truncated(&'static str),
    #[error("envelope key-size field is {0} bytes, expected 4")]
    KeySizeLength(usize),
    #[error("envelope read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully parsed (or about-to-be-packed) cipher envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Cipher key size in bits.
    pub key_size: i32,
    /// Per-encryption initialization vector, never secret.
    pub iv: Vec<u8>,
    /// Key-derivation salt; `Some` only for the salted passphrase variant.
    pub salt: Option<Vec<u8>>,
    /// The encrypted payload, including the authentication tag.
    pub ciphertext: Vec<u8>,
}

/// The prefix of an envelope without its ciphertext. Parsing only the header
/// lets a caller peek at key size and IV/salt without pulling the payload
/// out of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub key_size: i32,
    pub iv: Vec<u8>,
    pub salt: Option<Vec<u8>>,
    /// Offset of the first ciphertext byte within the packed envelope.
    pub ciphertext_offset: usize,
}

impl Envelope {
    /// Packs the envelope into its binary form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::FieldTooLong`] if the IV or salt does not fit
    /// behind a single-byte length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        if self.iv.len() > MAX_FIELD_LEN {
            return Err(EnvelopeError::FieldTooLong("iv"));
        }
        if let Some(salt) = &self.salt {
            if salt.len() > MAX_FIELD_LEN {
                return Err(EnvelopeError::FieldTooLong("salt"));
            }
        }

        let key_size = self.key_size.to_le_bytes();
        let salt_len = self.salt.as_ref().map(|s| s.len() + 1).unwrap_or(0);
        let mut bytes =
            Vec::with_capacity(1 + key_size.len() + 1 + self.iv.len() + salt_len + self.ciphertext.len());

        bytes.push(key_size.len() as u8);
        bytes.extend_from_slice(&key_size);
        bytes.push(self.iv.len() as u8);
        bytes.extend_from_slice(&self.iv);
        if let Some(salt) = &self.salt {
            bytes.push(salt.len() as u8);
            bytes.extend_from_slice(salt);
        }
        bytes.extend_from_slice(&self.ciphertext);

        Ok(bytes)
    }

    /// Unpacks an envelope, treating everything after the header as
    /// ciphertext. `has_salt` states which cipher variant wrote the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Truncated`] when a declared field length
    /// exceeds the remaining buffer.
    pub fn from_bytes(bytes: &[u8], has_salt: bool) -> Result<Self, EnvelopeError> {
        let header = EnvelopeHeader::parse(bytes, has_salt)?;
        let ciphertext = bytes[header.ciphertext_offset..].to_vec();
        Ok(Self {
            key_size: header.key_size,
            iv: header.iv,
            salt: header.salt,
            ciphertext,
        })
    }
}

impl EnvelopeHeader {
    /// Parses only the length-prefixed fields, leaving the ciphertext where
    /// it is. `ciphertext_offset` records where the payload begins.
    pub fn parse(bytes: &[u8], has_salt: bool) -> Result<Self, EnvelopeError> {
        let mut position = 0usize;

        let key_size_bytes = read_part(bytes, &mut position, "key size")?;
        let key_size = decode_key_size(key_size_bytes)?;
        let iv = read_part(bytes, &mut position, "iv")?.to_vec();
        let salt = if has_salt {
            Some(read_part(bytes, &mut position, "salt")?.to_vec())
        } else {
            None
        };

        Ok(Self {
            key_size,
            iv,
            salt,
            ciphertext_offset: position,
        })
    }

    /// Reads the header out of a stream without consuming the ciphertext.
    pub fn from_reader<R: Read>(reader: &mut R, has_salt: bool) -> Result<Self, EnvelopeError> {
        let mut position = 0usize;

        let key_size_bytes = read_stream_part(reader, &mut position, "key size")?;
        let key_size = decode_key_size(&key_size_bytes)?;
        let iv = read_stream_part(reader, &mut position, "iv")?;
        let salt = if has_salt {
            Some(read_stream_part(reader, &mut position, "salt")?)
        } else {
            None
        };

        Ok(Self {
            key_size,
            iv,
            salt,
            ciphertext_offset: position,
        })
    }
}

fn decode_key_size(bytes: &[u8]) -> Result<i32, EnvelopeError> {
    let arr: [u8; 4] = bytes
        .try_into()
        .map_err(|_| EnvelopeError::KeySizeLength(bytes.len()))?;
    Ok(i32::from_le_bytes(arr))
}

/// Reads one length-prefixed field and advances `position` past it.
fn read_part<'a>(
    bytes: &'a [u8],
    position: &mut usize,
    field: &'static str,
) -> Result<&'a [u8], EnvelopeError> {
    let len = *bytes
        .get(*position)
        .ok_or(EnvelopeError::Truncated(field))? as usize;
    let start = *position + 1;
    let end = start + len;
    if end > bytes.len() {
        return Err(EnvelopeError::Truncated(field));
    }
    *position = end;
    Ok(&bytes[start..end])
}

fn read_stream_part<R: Read>(
    reader: &mut R,
    position: &mut usize,
    field: &'static str,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut len = [0u8; 1];
    reader.read_exact(&mut len)?;
    let mut part = vec![0u8; len[0] as usize];
    reader
        .read_exact(&mut part)
        .map_err(|_| EnvelopeError::Truncated(field))?;
    *position += 1 + part.len();
    Ok(part)
}
