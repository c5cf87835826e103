//! Password-based encryption for configuration fields. Each submodule owns
//! one layer: text encoding, the binary envelope, the AES engine, and the
//! string facade the rest of the crate consumes.

pub mod cipher;
pub mod encoding;
pub mod envelope;
pub mod secrets;
