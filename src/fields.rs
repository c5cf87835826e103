//! Field-level encryption hooks. A registry maps field paths to keys and is
//! applied to the serialized document tree: registered string fields are
//! encrypted on the way out and decrypted on the way back in, so the rest of
//! the document stays plaintext.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::crypto::cipher::CipherError;
use crate::crypto::secrets::{decrypt_string, encrypt_string};

#[derive(Debug, Error)]
pub enum FieldError {
    /// Encryption is restricted to string-typed fields.
    #[error("field `{0}` is not a string and cannot be encrypted")]
    NotAString(String),
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

/// Registry of fields to encrypt, keyed by dot-separated path within the
/// configuration document (`"connection_string"`, `"database.password"`).
/// One key string per field.
#[derive(Clone, Default)]
pub struct EncryptedFields {
    fields: BTreeMap<String, String>,
}

// Key strings must not leak through logs; show only the registered paths.
impl std::fmt::Debug for EncryptedFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedFields")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EncryptedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field for transparent encryption under `key`.
    pub fn add(&mut self, path: impl Into<String>, key: impl Into<String>) {
        self.fields.insert(path.into(), key.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encrypts every registered field in `document` before serialization.
    ///
    /// Null fields stay null and empty strings become null; the cipher is
    /// never invoked for an empty value. Absent fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::NotAString`] when a registered field holds a
    /// non-string value, and propagates cipher failures.
    pub fn seal(&self, document: &mut Value) -> Result<(), FieldError> {
        for (path, key) in &self.fields {
            let Some(slot) = lookup_mut(document, path) else {
                continue;
            };
            let sealed = match &*slot {
                Value::Null => continue,
                Value::String(text) if text.is_empty() => Value::Null,
                Value::String(text) => Value::String(encrypt_string(text, key)?),
                _ => return Err(FieldError::NotAString(path.clone())),
            };
            *slot = sealed;
        }
        Ok(())
    }

    /// Decrypts every registered field in `document` after parsing.
    ///
    /// This direction is lenient: any decryption failure (wrong key, corrupt
    /// envelope, a stored value that was never ciphertext) downgrades the
    /// field to null instead of failing the load. Null, empty, and
    /// non-string values pass through untouched.
    pub fn open(&self, document: &mut Value) {
        for (path, key) in &self.fields {
            let Some(slot) = lookup_mut(document, path) else {
                continue;
            };
            let Value::String(text) = &*slot else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let opened = match decrypt_string(text, key) {
                Ok(plaintext) => Value::String(plaintext),
                Err(err) => {
                    warn!(field = %path, error = %err, "field could not be decrypted; resolving to null");
                    Value::Null
                }
            };
            *slot = opened;
        }
    }
}

/// Resolves a dot-separated path to a mutable slot in the document tree.
fn lookup_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}
