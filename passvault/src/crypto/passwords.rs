//! Account password hashing. Stored hashes are Argon2id PHC strings; a row
//! that does not parse as one is a storage fault, not a failed login.

use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use thiserror::Error;

const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const LANES: u32 = 1;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("argon2 setup failed: {0}")]
    Setup(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("stored password hash uses unsupported algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    Params::new(MEMORY_COST_KIB, TIME_COST, LANES, None)
        .map(|params| Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        .map_err(|e| PasswordError::Setup(e.to_string()))
}

/// Hashes a new account password into a salted PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()?
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Checks `plaintext` against a stored hash. `Ok(false)` means the password is
/// wrong; an `Err` means the stored hash itself cannot be used.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::MalformedHash)?;
    if parsed.algorithm != Algorithm::Argon2id.ident() {
        return Err(PasswordError::UnsupportedAlgorithm(parsed.algorithm.as_str().to_owned()));
    }

    match hasher()?.verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}
