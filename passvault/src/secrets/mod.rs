//! Typed secrets, their byte encoding, and the vault that seals and stores them.

pub mod codec;
pub mod model;
pub mod vault;

pub use model::{CardSecret, PasswordSecret, Secret, SecretMetadata, SecretType, TextSecret};
pub use vault::SecretVault;
