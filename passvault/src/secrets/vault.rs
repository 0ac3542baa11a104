//! Save/fetch pipeline for typed secrets: codec, then cipher, then repository,
//! and the reverse on reads. Only ciphertext ever reaches the repository.

use std::sync::Arc;

use tracing::{debug, error, warn};
use zeroize::Zeroize;

use super::codec::{self, CodecError};
use super::model::{CardSecret, PasswordSecret, Secret, SecretMetadata, SecretType, TextSecret};
use crate::crypto::Cryptographer;
use crate::error::ServiceError;
use crate::storage::{SecretsRepository, StorageError};

pub struct SecretVault {
    repo: Arc<dyn SecretsRepository>,
    cryptographer: Arc<Cryptographer>,
}

impl SecretVault {
    pub fn new(repo: Arc<dyn SecretsRepository>, cryptographer: Arc<Cryptographer>) -> Self {
        Self { repo, cryptographer }
    }

    /// Encodes, encrypts and persists `secret` under `metadata`. Nothing is
    /// written unless both pure steps succeed.
    pub fn save(&self, secret: &Secret, metadata: &SecretMetadata) -> Result<(), ServiceError> {
        if secret.kind() != metadata.kind {
            error!(%metadata, actual = secret.kind().tag(), "secret does not match its metadata type");
            return Err(CodecError::TypeMismatch {
                expected: metadata.kind,
                found: secret.kind(),
            }
            .into());
        }

        let mut plaintext = codec::encode(secret).map_err(|err| {
            error!(%metadata, error = %err, "cant encode secret");
            ServiceError::from(err)
        })?;
        let sealed = self.cryptographer.encrypt(&plaintext);
        plaintext.zeroize();
        let ciphertext = sealed.map_err(|err| {
            error!(%metadata, error = %err, "cant encrypt secret");
            ServiceError::from(err)
        })?;

        match self.repo.create_new(ciphertext, metadata) {
            Ok(()) => {
                debug!(%metadata, "secret saved");
                Ok(())
            }
            Err(err @ StorageError::DuplicateSecret(_)) => {
                warn!(%metadata, "secret name already taken");
                Err(err.into())
            }
            Err(err) => {
                error!(%metadata, error = %err, "cant save secret");
                Err(err.into())
            }
        }
    }

    /// Loads, decrypts and decodes the secret stored under `metadata`. The
    /// result is always the variant named by `metadata.kind`.
    pub fn fetch(&self, metadata: &SecretMetadata) -> Result<Secret, ServiceError> {
        let ciphertext = self.repo.find_ciphertext(metadata).map_err(|err| {
            match &err {
                StorageError::SecretNotFound(_) => debug!(%metadata, "secret not found"),
                _ => error!(%metadata, error = %err, "cant get secret from storage"),
            }
            ServiceError::from(err)
        })?;

        let mut plaintext = self.cryptographer.decrypt(&ciphertext).map_err(|err| {
            error!(%metadata, error = %err, "cant decrypt secret");
            ServiceError::from(err)
        })?;
        let decoded = codec::decode(&plaintext, metadata.kind);
        plaintext.zeroize();

        decoded.map_err(|err| {
            error!(%metadata, error = %err, "cant decode secret");
            ServiceError::from(err)
        })
    }

    pub fn fetch_password(&self, user_id: i64, name: &str) -> Result<PasswordSecret, ServiceError> {
        match self.fetch(&SecretMetadata::new(user_id, SecretType::Password, name))? {
            Secret::Password(secret) => Ok(secret),
            other => Err(mismatch(SecretType::Password, &other)),
        }
    }

    pub fn fetch_card(&self, user_id: i64, name: &str) -> Result<CardSecret, ServiceError> {
        match self.fetch(&SecretMetadata::new(user_id, SecretType::Card, name))? {
            Secret::Card(secret) => Ok(secret),
            other => Err(mismatch(SecretType::Card, &other)),
        }
    }

    pub fn fetch_text(&self, user_id: i64, name: &str) -> Result<TextSecret, ServiceError> {
        match self.fetch(&SecretMetadata::new(user_id, SecretType::Text, name))? {
            Secret::Text(secret) => Ok(secret),
            other => Err(mismatch(SecretType::Text, &other)),
        }
    }
}

fn mismatch(expected: SecretType, found: &Secret) -> ServiceError {
    CodecError::TypeMismatch {
        expected,
        found: found.kind(),
    }
    .into()
}
