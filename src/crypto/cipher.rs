//! AES-256-GCM engine behind the string cipher. Two variants write the same
//! envelope format: the passphrase variant derives its key with Argon2id and
//! stores the derivation salt in the envelope; the raw-key variant takes a
//! 32-byte key directly and writes no salt block.

use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

use super::envelope::Envelope;

/// Byte length of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Key size recorded in every envelope, in bits.
pub const KEY_SIZE_BITS: i32 = 256;

/// Byte length of the AES-GCM nonce stored as the envelope IV.
pub const NONCE_LEN: usize = 12;

/// Byte length of the per-encryption key-derivation salt.
pub const SALT_LEN: usize = 16;

// Argon2id parameters shared by every passphrase-derived key.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum CipherError {
    /// A caller passed blank text or a blank passphrase.
    #[error("argument `{0}` must not be blank")]
    BlankArgument(&'static str),
    /// The input string is not valid in its required encoding.
    #[error("input is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// Decryption produced bytes that are not valid UTF-8 text.
    #[error("decrypted payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// A raw key had the wrong length for AES-256.
    #[error("invalid key length; expected {KEY_LEN} bytes")]
    InvalidKeyLength,
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// Wrong key, tampered ciphertext, or a truncated/corrupt envelope.
    /// The cases are indistinguishable to callers on purpose.
    #[error("decryption failed: wrong key or corrupt cipher envelope")]
    DecryptionFailed,
}

/// Produces 32 fresh random key bytes from the OS CSPRNG.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

/// Encrypts `plaintext` under a key derived from `passphrase` and a fresh
/// random salt, returning the packed salted envelope. Every call draws a new
/// salt and nonce, so identical inputs never produce identical envelopes.
pub fn encrypt_with_passphrase(
    plaintext: &[u8],
    passphrase: &str,
) -> Result<Vec<u8>, CipherError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = derive_key(passphrase, &salt)?;
    let result = seal(plaintext, &key, Some(salt.to_vec()));
    key.zeroize();
    result
}

/// Decrypts a salted envelope produced by [`encrypt_with_passphrase`],
/// re-deriving the key from `passphrase` and the recovered salt.
pub fn decrypt_with_passphrase(
    envelope_bytes: &[u8],
    passphrase: &str,
) -> Result<Vec<u8>, CipherError> {
    let envelope =
        Envelope::from_bytes(envelope_bytes, true).map_err(|_| CipherError::DecryptionFailed)?;
    let Some(salt) = envelope.salt.clone() else {
        return Err(CipherError::DecryptionFailed);
    };

    let mut key = derive_key(passphrase, &salt)?;
    let result = open(&envelope, &key);
    key.zeroize();
    result
}

/// Encrypts `plaintext` under a raw 32-byte key, returning the packed
/// unsalted envelope.
pub fn encrypt_with_key(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CipherError::InvalidKeyLength)?;
    seal(plaintext, &key, None)
}

/// Decrypts an unsalted envelope produced by [`encrypt_with_key`].
pub fn decrypt_with_key(envelope_bytes: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key: [u8; KEY_LEN] = key.try_into().map_err(|_| CipherError::InvalidKeyLength)?;
    let envelope =
        Envelope::from_bytes(envelope_bytes, false).map_err(|_| CipherError::DecryptionFailed)?;
    open(&envelope, &key)
}

/// Derives a 32-byte key from a passphrase and salt using Argon2id.
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CipherError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| CipherError::DerivationFailed(format!("{e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output)
        .map_err(|e| CipherError::DerivationFailed(format!("{e}")))?;
    Ok(output)
}

fn seal(
    plaintext: &[u8],
    key: &[u8; KEY_LEN],
    salt: Option<Vec<u8>>,
) -> Result<Vec<u8>, CipherError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))?;

    let envelope = Envelope {
        key_size: KEY_SIZE_BITS,
        iv: nonce.to_vec(),
        salt,
        ciphertext,
    };
    envelope
        .to_bytes()
        .map_err(|e| CipherError::EncryptionFailed(format!("{e}")))
}

fn open(envelope: &Envelope, key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CipherError> {
    if envelope.key_size != KEY_SIZE_BITS || envelope.iv.len() != NONCE_LEN {
        return Err(CipherError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
    cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_ref())
        .map_err(|_| CipherError::DecryptionFailed)
}
