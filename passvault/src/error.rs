//! Request-level error taxonomy. Module errors convert into [`ServiceError`],
//! and each variant maps onto a transport-neutral status [`Code`].

use thiserror::Error;

use crate::auth::token::TokenError;
use crate::crypto::cipher::CryptoError;
use crate::secrets::codec::CodecError;
use crate::secrets::model::SecretMetadata;
use crate::storage::StorageError;

/// Status codes handed to the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Unauthenticated,
    AlreadyExists,
    NotFound,
    InvalidArgument,
    Internal,
}

impl Code {
    pub fn as_str(&self) -> &'static str {
        match self {
            Code::Unauthenticated => "unauthenticated",
            Code::AlreadyExists => "already_exists",
            Code::NotFound => "not_found",
            Code::InvalidArgument => "invalid_argument",
            Code::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("secret already exists: {0}")]
    DuplicateSecret(SecretMetadata),
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("secret not found: {0}")]
    SecretNotFound(SecretMetadata),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("cannot decode secret: {0}")]
    Decode(#[from] CodecError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn unauthenticated<T: Into<String>>(message: T) -> Self {
        ServiceError::Unauthenticated(message.into())
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        ServiceError::Internal(message.into())
    }

    pub fn code(&self) -> Code {
        match self {
            ServiceError::Unauthenticated(_) | ServiceError::InvalidCredentials => Code::Unauthenticated,
            ServiceError::DuplicateSecret(_) | ServiceError::DuplicateUsername(_) => Code::AlreadyExists,
            ServiceError::SecretNotFound(_) | ServiceError::UserNotFound(_) => Code::NotFound,
            ServiceError::InvalidArgument(_) => Code::InvalidArgument,
            ServiceError::DecryptionFailed
            | ServiceError::Decode(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => Code::Internal,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::DuplicateSecret(metadata) => ServiceError::DuplicateSecret(metadata),
            StorageError::SecretNotFound(metadata) => ServiceError::SecretNotFound(metadata),
            StorageError::DuplicateUsername(name) => ServiceError::DuplicateUsername(name),
            StorageError::UserNotFound(name) => ServiceError::UserNotFound(name),
            StorageError::Backend(message) => ServiceError::Storage(message),
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(value: CryptoError) -> Self {
        match value {
            CryptoError::DecryptionFailed => ServiceError::DecryptionFailed,
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::MissingKey | TokenError::Signing(_) => ServiceError::Internal(value.to_string()),
            other => ServiceError::Unauthenticated(format!("access token is invalid: {other}")),
        }
    }
}
