//! String-level entry points for field encryption. Values cross this
//! boundary as printable strings only: UTF-8 text in, encoded cipher
//! envelope out, and back. Unlike the field hooks in [`crate::fields`],
//! nothing is swallowed here; every failure reaches the caller.

use super::{cipher, encoding};
use cipher::CipherError;

/// Encrypts a string under a passphrase and returns the base64-encoded
/// cipher envelope.
///
/// # Errors
///
/// Returns [`CipherError::BlankArgument`] when `text` or `passphrase` is
/// empty or whitespace-only.
pub fn encrypt_string(text: &str, passphrase: &str) -> Result<String, CipherError> {
    if text.trim().is_empty() {
        return Err(CipherError::BlankArgument("text"));
    }
    if passphrase.trim().is_empty() {
        return Err(CipherError::BlankArgument("passphrase"));
    }

    let envelope = cipher::encrypt_with_passphrase(text.as_bytes(), passphrase)?;
    Ok(encoding::encode(&envelope))
}

/// Decrypts a string produced by [`encrypt_string`]. The input may be hex
/// or base64 encoded; the scheme is detected automatically so ciphertext
/// written by the older hex-only format keeps working.
///
/// # Errors
///
/// Returns [`CipherError::BlankArgument`] for blank arguments,
/// [`CipherError::InvalidEncoding`] when the input is neither hex nor valid
/// base64, and [`CipherError::DecryptionFailed`] for a wrong passphrase or a
/// corrupt envelope.
pub fn decrypt_string(cipher_text: &str, passphrase: &str) -> Result<String, CipherError> {
    if cipher_text.trim().is_empty() {
        return Err(CipherError::BlankArgument("cipher_text"));
    }
    if passphrase.trim().is_empty() {
        return Err(CipherError::BlankArgument("passphrase"));
    }

    let envelope = encoding::decode(cipher_text)?;
    let plaintext = cipher::decrypt_with_passphrase(&envelope, passphrase)?;
    Ok(String::from_utf8(plaintext)?)
}

/// Creates a fresh random key, base64 encoded. Generate it once, store it in
/// a deployment secret store, and pass it as the passphrase thereafter.
pub fn create_random_key() -> String {
    encoding::encode(&cipher::generate_key())
}

#[cfg(test)]
mod tests {
    use super::{create_random_key, decrypt_string, encrypt_string};
    use crate::crypto::cipher::CipherError;
    use crate::crypto::encoding;

    const KEY: &str = "cfVMjtOJ8/eJx0037MHNym3awHj9iAUBdM/bmiLUvlc=";

    #[test]
    fn encrypts_and_decrypts_a_connection_string() {
        let cipher = encrypt_string("super_secret_connection_string", KEY)
            .expect("encryption should succeed");

        assert!(!cipher.contains("super_secret_connection_string"));
        let decrypted = decrypt_string(&cipher, KEY).expect("decryption should succeed");
        assert_eq!(decrypted, "super_secret_connection_string");
    }

    #[test]
    fn repeated_calls_produce_distinct_cipher_text() {
        let first = encrypt_string("100% fluffy goodness", KEY).expect("first encryption");
        let second = encrypt_string("100% fluffy goodness", KEY).expect("second encryption");
        assert_ne!(first, second);
        assert_eq!(
            decrypt_string(&first, KEY).expect("first decryption"),
            decrypt_string(&second, KEY).expect("second decryption"),
        );
    }

    #[test]
    fn rejects_blank_arguments() {
        assert!(matches!(
            encrypt_string(" ", KEY).unwrap_err(),
            CipherError::BlankArgument("text")
        ));
        assert!(matches!(
            encrypt_string("text", "").unwrap_err(),
            CipherError::BlankArgument("passphrase")
        ));
        assert!(matches!(
            decrypt_string("", KEY).unwrap_err(),
            CipherError::BlankArgument("cipher_text")
        ));
        assert!(matches!(
            decrypt_string("AAAA", "  ").unwrap_err(),
            CipherError::BlankArgument("passphrase")
        ));
    }

    #[test]
    fn rejects_input_that_is_not_cipher_text() {
        // Spaces and '%' rule out both hex and base64.
        let err = decrypt_string("100% fluffy goodness", KEY).unwrap_err();
        assert!(matches!(err, CipherError::InvalidEncoding(_)));
    }

    #[test]
    fn wrong_key_is_a_cryptographic_error() {
        let cipher = encrypt_string("100% fluffy goodness", &create_random_key())
            .expect("encryption should succeed");
        let err = decrypt_string(&cipher, &create_random_key()).unwrap_err();
        assert!(matches!(err, CipherError::DecryptionFailed));
    }

    #[test]
    fn decodes_legacy_hex_encoded_envelopes() {
        let cipher = encrypt_string("legacy value", KEY).expect("encryption should succeed");
        let raw = encoding::decode(&cipher).expect("fresh cipher text decodes");

        let hex_cipher = encoding::to_hex(&raw);
        let decrypted = decrypt_string(&hex_cipher, KEY).expect("hex form should decrypt");
        assert_eq!(decrypted, "legacy value");
    }

    #[test]
    fn random_keys_are_valid_base64_and_distinct() {
        let first = create_random_key();
        let second = create_random_key();
        assert_ne!(first, second);
        assert_eq!(
            encoding::decode(&first).expect("key should decode").len(),
            32
        );
    }
}
