//! Repository interfaces consumed by the vault and the login flow.
//!
//! Implementations own the persisted rows and their uniqueness constraints;
//! they must report conflicts and misses distinctly from generic failures.

use thiserror::Error;

use crate::secrets::model::SecretMetadata;

pub mod memory;

pub use memory::{MemorySecretsRepository, MemoryUsersRepository};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("secret already exists: {0}")]
    DuplicateSecret(SecretMetadata),
    #[error("secret not found: {0}")]
    SecretNotFound(SecretMetadata),
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("user not found: login = {0}")]
    UserNotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Account row as returned by the users repository.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Encrypted secret rows keyed by `(user_id, type, name)`.
pub trait SecretsRepository: Send + Sync {
    /// Inserts a new row. Fails with [`StorageError::DuplicateSecret`] when the
    /// key is taken; concurrent inserts of one key see exactly one success.
    fn create_new(&self, ciphertext: Vec<u8>, metadata: &SecretMetadata) -> Result<(), StorageError>;

    /// Loads the ciphertext stored under the key.
    fn find_ciphertext(&self, metadata: &SecretMetadata) -> Result<Vec<u8>, StorageError>;
}

/// User accounts for the register/login flow.
pub trait UsersRepository: Send + Sync {
    fn create_new(&self, username: &str, hashed_password: &str) -> Result<User, StorageError>;

    fn find_by_username(&self, username: &str) -> Result<User, StorageError>;
}

impl<T> SecretsRepository for std::sync::Arc<T>
where
    T: SecretsRepository + ?Sized,
{
    fn create_new(&self, ciphertext: Vec<u8>, metadata: &SecretMetadata) -> Result<(), StorageError> {
        (**self).create_new(ciphertext, metadata)
    }

    fn find_ciphertext(&self, metadata: &SecretMetadata) -> Result<Vec<u8>, StorageError> {
        (**self).find_ciphertext(metadata)
    }
}

impl<T> UsersRepository for std::sync::Arc<T>
where
    T: UsersRepository + ?Sized,
{
    fn create_new(&self, username: &str, hashed_password: &str) -> Result<User, StorageError> {
        (**self).create_new(username, hashed_password)
    }

    fn find_by_username(&self, username: &str) -> Result<User, StorageError> {
        (**self).find_by_username(username)
    }
}
