//! Cryptography for the vault: the payload cipher, password hashing for user
//! accounts, and keyed integrity helpers used by access tokens.

pub mod cipher;
pub mod integrity;
pub mod passwords;

pub use cipher::{CryptoError, Cryptographer};
