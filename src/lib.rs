//! Configuration management with transparently encrypted secret fields.
//! Configuration objects round-trip through JSON or TOML documents while
//! registered string fields (connection strings, tokens, API keys) are
//! stored as password-encrypted cipher envelopes instead of plaintext.

pub mod config;
pub mod crypto;
pub mod fields;
pub mod format;

pub use config::{ConfigError, ConfigManager};
pub use crypto::secrets::{create_random_key, decrypt_string, encrypt_string};
pub use fields::EncryptedFields;
pub use format::DocumentFormat;
