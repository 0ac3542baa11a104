//! Authenticated payload encryption built on ChaCha20-Poly1305.
//! Payloads are sealed as `nonce || ciphertext || tag`; the nonce is drawn from
//! the OS CSPRNG for every call so a fixed key stays safe across restarts.

use std::fs;
use std::path::Path;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::Zeroize;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length; expected 32 bytes")]
    InvalidKeyLength,
    #[error("argon2 derivation failed: {0}")]
    DerivationFailed(String),
    #[error("encryption failed")]
    EncryptionFailed,
    // Tampering, wrong key and truncation all map here; no input bytes are echoed.
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("key source unreadable: {0}")]
    KeySourceUnreadable(String),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
}

/// Decodes base64 key material, tolerating surrounding whitespace and padding.
pub fn decode_key_b64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = encoded.trim().trim_end_matches('=');
    STANDARD_NO_PAD
        .decode(trimmed.as_bytes())
        .map_err(|e| CryptoError::Base64DecodeFailed(format!("{e}")))
}

/// Holds the process-wide symmetric key. Immutable after construction, so a
/// single instance can be shared by every in-flight request.
pub struct Cryptographer {
    key: Key,
}

impl Cryptographer {
    /// Builds a cryptographer from raw key bytes. The key must be 32 bytes for ChaCha20-Poly1305.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength);
        }
        let mut key = Key::default();
        key.copy_from_slice(key_bytes);
        Ok(Self { key })
    }

    /// Reads a base64-encoded key from an environment variable.
    pub fn from_env_var(var: &str) -> Result<Self, CryptoError> {
        let encoded = std::env::var(var)
            .map_err(|e| CryptoError::KeySourceUnreadable(format!("{var}: {e}")))?;
        let mut decoded = decode_key_b64(&encoded)?;
        let built = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        built
    }

    /// Reads a base64-encoded key from disk.
    pub fn from_key_file(path: &Path) -> Result<Self, CryptoError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CryptoError::KeySourceUnreadable(format!("{}: {e}", path.display())))?;
        let mut decoded = decode_key_b64(&content)?;
        let built = Self::from_key_bytes(&decoded);
        decoded.zeroize();
        built
    }

    /// Derives a key from a passphrase using Argon2id. Salt must be random and
    /// unique per deployment; it is stored in configuration next to the key reference.
    pub fn derive_from_passphrase(passphrase: &str, salt: &[u8]) -> Result<Self, CryptoError> {
        let params = Params::new(19 * 1024, 3, 1, Some(KEY_LEN))
            .map_err(|e| CryptoError::DerivationFailed(format!("{e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut output = [0u8; KEY_LEN];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt, &mut output)
            .map_err(|e| CryptoError::DerivationFailed(format!("{e}")))?;

        let cryptographer = Self::from_key_bytes(&output)?;
        output.zeroize();
        Ok(cryptographer)
    }

    /// Seals a plaintext payload. Every call uses a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext_and_tag = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext_and_tag.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext_and_tag);
        Ok(sealed)
    }

    /// Opens a payload produced by [`Cryptographer::encrypt`].
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        let (nonce_bytes, ciphertext_and_tag) = sealed.split_at(NONCE_LEN);

        let cipher = ChaCha20Poly1305::new(&self.key);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext_and_tag)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

impl Drop for Cryptographer {
    fn drop(&mut self) {
        self.key.as_mut_slice().zeroize();
    }
}

impl std::fmt::Debug for Cryptographer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cryptographer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_key_b64, CryptoError, Cryptographer, NONCE_LEN, TAG_LEN};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use std::fs;
    use tempfile::NamedTempFile;

    fn cryptographer() -> Cryptographer {
        Cryptographer::from_key_bytes(&[42u8; 32]).expect("key should be valid")
    }

    #[test]
    fn encrypts_and_decrypts_round_trip() {
        let crypto = cryptographer();
        let payloads: [&[u8]; 4] = [b"", b"x", b"secret-token", &[0u8; 4096]];
        for payload in payloads {
            let sealed = crypto.encrypt(payload).expect("encryption should succeed");
            assert_eq!(sealed.len(), NONCE_LEN + payload.len() + TAG_LEN);
            let opened = crypto.decrypt(&sealed).expect("decryption should succeed");
            assert_eq!(opened, payload);
        }
    }

    #[test]
    fn never_repeats_ciphertext_for_same_plaintext() {
        let crypto = cryptographer();
        let first = crypto.encrypt(b"payload").expect("encryption should succeed");
        let second = crypto.encrypt(b"payload").expect("encryption should succeed");
        assert_ne!(first, second);
        assert_ne!(first[..NONCE_LEN], second[..NONCE_LEN]);
    }

    #[test]
    fn detects_every_flipped_bit() {
        let crypto = cryptographer();
        let sealed = crypto.encrypt(b"card 4111").expect("encryption should succeed");
        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                let err = crypto.decrypt(&tampered).unwrap_err();
                assert!(matches!(err, CryptoError::DecryptionFailed));
            }
        }
    }

    #[test]
    fn rejects_truncated_input() {
        let crypto = cryptographer();
        let sealed = crypto.encrypt(b"payload").expect("encryption should succeed");
        let err = crypto.decrypt(&sealed[..NONCE_LEN + TAG_LEN - 1]).unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed));
        assert!(crypto.decrypt(&[]).is_err());
    }

    #[test]
    fn rejects_wrong_key() {
        let sealed = cryptographer().encrypt(b"payload").expect("encryption should succeed");
        let other = Cryptographer::from_key_bytes(&[7u8; 32]).expect("valid key");
        let err = other.decrypt(&sealed).unwrap_err();
        assert_eq!(format!("{err}"), "decryption failed");
    }

    #[test]
    fn rejects_bad_keys() {
        let err = Cryptographer::from_key_bytes(&[1u8; 16]).unwrap_err();
        assert!(format!("{err}").contains("invalid key length"));
    }

    #[test]
    fn derives_key_from_passphrase() {
        let salt = b"static-test-salt-123";
        let crypto = Cryptographer::derive_from_passphrase("pa55phrase", salt)
            .expect("derivation should succeed");
        let again = Cryptographer::derive_from_passphrase("pa55phrase", salt)
            .expect("derivation should succeed");
        let sealed = crypto.encrypt(b"payload").expect("encryption should work");
        assert_eq!(again.decrypt(&sealed).expect("same key"), b"payload");
    }

    #[test]
    fn loads_padded_key_from_file() {
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), format!("{}\n", STANDARD.encode([9u8; 32]))).expect("write key");
        let crypto = Cryptographer::from_key_file(file.path()).expect("key file should load");
        let sealed = crypto.encrypt(b"x").expect("encryption should work");
        assert_eq!(crypto.decrypt(&sealed).expect("round trip"), b"x");
    }

    #[test]
    fn decodes_unpadded_and_padded_base64() {
        let padded = STANDARD.encode([3u8; 32]);
        assert!(padded.ends_with('='));
        assert_eq!(decode_key_b64(&padded).expect("padded"), vec![3u8; 32]);
        assert_eq!(
            decode_key_b64(padded.trim_end_matches('=')).expect("unpadded"),
            vec![3u8; 32]
        );
    }
}
