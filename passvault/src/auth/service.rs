//! Account registration and login over the users repository.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::crypto::passwords::{hash_password, verify_password};
use crate::error::ServiceError;
use crate::storage::{StorageError, User, UsersRepository};

pub struct AuthService {
    users: Arc<dyn UsersRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepository>) -> Self {
        Self { users }
    }

    /// Creates an account with an Argon2id-hashed password.
    pub fn register(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        if username.trim().is_empty() {
            return Err(ServiceError::InvalidArgument("username must not be empty".into()));
        }
        let hashed = hash_password(password)
            .map_err(|e| ServiceError::internal(format!("cannot hash password: {e}")))?;

        match self.users.create_new(username, &hashed) {
            Ok(user) => {
                info!(user_id = user.id, "user registered");
                Ok(user)
            }
            Err(err @ StorageError::DuplicateUsername(_)) => {
                warn!("registration with taken username");
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Checks the password of an existing account.
    pub fn login(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let user = self.users.find_by_username(username)?;
        let matches = verify_password(password, &user.hashed_password).map_err(|e| {
            error!(user_id = user.id, error = %e, "stored password hash unusable");
            ServiceError::internal(format!("cannot verify password: {e}"))
        })?;
        if !matches {
            warn!(user_id = user.id, "incorrect password");
            return Err(ServiceError::InvalidCredentials);
        }
        info!(user_id = user.id, "user logged in");
        Ok(user)
    }
}
