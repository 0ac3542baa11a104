//! Process-local repositories. The mutex is the serialization point for the
//! uniqueness checks, standing in for a database constraint.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{SecretsRepository, StorageError, User, UsersRepository};
use crate::secrets::model::SecretMetadata;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|_| StorageError::Backend("repository lock poisoned".to_string()))
}

#[derive(Default)]
pub struct MemorySecretsRepository {
    rows: Mutex<HashMap<SecretMetadata, Vec<u8>>>,
}

impl MemorySecretsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretsRepository for MemorySecretsRepository {
    fn create_new(&self, ciphertext: Vec<u8>, metadata: &SecretMetadata) -> Result<(), StorageError> {
        let mut rows = lock(&self.rows)?;
        match rows.entry(metadata.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateSecret(metadata.clone())),
            Entry::Vacant(slot) => {
                slot.insert(ciphertext);
                Ok(())
            }
        }
    }

    fn find_ciphertext(&self, metadata: &SecretMetadata) -> Result<Vec<u8>, StorageError> {
        lock(&self.rows)?
            .get(metadata)
            .cloned()
            .ok_or_else(|| StorageError::SecretNotFound(metadata.clone()))
    }
}

#[derive(Default)]
struct UserTable {
    by_name: HashMap<String, User>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryUsersRepository {
    table: Mutex<UserTable>,
}

impl MemoryUsersRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UsersRepository for MemoryUsersRepository {
    fn create_new(&self, username: &str, hashed_password: &str) -> Result<User, StorageError> {
        let mut table = lock(&self.table)?;
        if table.by_name.contains_key(username) {
            return Err(StorageError::DuplicateUsername(username.to_string()));
        }
        table.last_id += 1;
        let user = User {
            id: table.last_id,
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        table.by_name.insert(username.to_string(), user.clone());
        Ok(user)
    }

    fn find_by_username(&self, username: &str) -> Result<User, StorageError> {
        lock(&self.table)?
            .by_name
            .get(username)
            .cloned()
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))
    }
}
