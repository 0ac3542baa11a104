//! Converts typed secrets to and from opaque bytes.
//!
//! The encoding is a self-describing JSON envelope `{"kind": <tag>, "body": {..}}`.
//! Byte stability across versions is not promised; the type tag is. Decoding is
//! driven by the caller's expected type and fails loudly when the stored tag or
//! the body shape disagrees with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::model::{CardSecret, PasswordSecret, Secret, SecretType, TextSecret};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("secret encoding failed: {0}")]
    Encode(String),
    #[error("malformed secret payload: {0}")]
    Malformed(String),
    #[error("unknown secret type tag {0}")]
    UnknownTag(u8),
    #[error("secret type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        expected: SecretType,
        found: SecretType,
    },
}

impl CodecError {
    // serde_json messages may quote the offending value; keep only the
    // category and position so plaintext never ends up in error text.
    fn malformed(err: serde_json::Error) -> Self {
        CodecError::Malformed(format!("{:?} error at column {}", err.classify(), err.column()))
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    kind: SecretType,
    body: &'a T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    kind: u8,
    body: Value,
}

/// Serializes a secret into its envelope bytes.
pub fn encode(secret: &Secret) -> Result<Vec<u8>, CodecError> {
    let kind = secret.kind();
    let encoded = match secret {
        Secret::Password(body) => serde_json::to_vec(&EnvelopeRef { kind, body }),
        Secret::Card(body) => serde_json::to_vec(&EnvelopeRef { kind, body }),
        Secret::Text(body) => serde_json::to_vec(&EnvelopeRef { kind, body }),
    };
    encoded.map_err(|e| CodecError::Encode(format!("{:?}", e.classify())))
}

/// Rebuilds the secret variant named by `expected` from envelope bytes.
pub fn decode(bytes: &[u8], expected: SecretType) -> Result<Secret, CodecError> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(CodecError::malformed)?;
    let found = SecretType::from_tag(envelope.kind).ok_or(CodecError::UnknownTag(envelope.kind))?;
    if found != expected {
        return Err(CodecError::TypeMismatch { expected, found });
    }

    let secret = match expected {
        SecretType::Password => {
            Secret::Password(serde_json::from_value::<PasswordSecret>(envelope.body).map_err(CodecError::malformed)?)
        }
        SecretType::Card => {
            Secret::Card(serde_json::from_value::<CardSecret>(envelope.body).map_err(CodecError::malformed)?)
        }
        SecretType::Text => {
            Secret::Text(serde_json::from_value::<TextSecret>(envelope.body).map_err(CodecError::malformed)?)
        }
    };
    Ok(secret)
}
