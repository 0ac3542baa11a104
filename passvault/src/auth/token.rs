//! Signed, time-bound access tokens.
//!
//! Tokens use the compact JWT layout `header.claims.signature` with HS256, so
//! verification is a single in-process HMAC check with no session lookup.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

use super::Identity;
use crate::crypto::integrity::{hmac_sha256, verify_hmac_sha256, IntegrityError};

pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(15 * 60);

const ALGORITHM: &str = "HS256";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing key is not configured")]
    MissingKey,
    #[error("malformed token: {0}")]
    Malformed(&'static str),
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    iat: u64,
    exp: u64,
}

pub struct TokenManager {
    key: Vec<u8>,
    validity: Duration,
}

impl TokenManager {
    pub fn new(key: &[u8], validity: Duration) -> Result<Self, TokenError> {
        if key.is_empty() {
            return Err(TokenError::MissingKey);
        }
        Ok(Self {
            key: key.to_vec(),
            validity,
        })
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issues a token for `identity` valid from now until now + validity window.
    pub fn generate(&self, identity: Identity) -> Result<String, TokenError> {
        self.generate_at(identity, unix_now())
    }

    pub fn generate_at(&self, identity: Identity, issued_at: u64) -> Result<String, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: identity.user_id,
            iat: issued_at,
            exp: issued_at.saturating_add(self.validity.as_secs()),
        };

        let header = serde_json::to_vec(&header).map_err(|e| TokenError::Signing(format!("{e}")))?;
        let claims = serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(format!("{e}")))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = hmac_sha256(&self.key, signing_input.as_bytes())
            .map_err(|e| TokenError::Signing(format!("{e}")))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Checks signature and expiry and returns the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        self.verify_at(token, unix_now())
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<Identity, TokenError> {
        let token = token.trim();
        let mut segments = token.split('.');
        let (header_b64, claims_b64, signature_b64) = match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return Err(TokenError::Malformed("expected three segments")),
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64.as_bytes())
            .map_err(|_| TokenError::Malformed("invalid header encoding"))?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed("invalid header"))?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Malformed("unsupported signing algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64.as_bytes())
            .map_err(|_| TokenError::Malformed("invalid signature encoding"))?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        verify_hmac_sha256(&self.key, signing_input.as_bytes(), &signature).map_err(|err| match err {
            IntegrityError::SignatureMismatch => TokenError::BadSignature,
            other => TokenError::Signing(format!("{other}")),
        })?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64.as_bytes())
            .map_err(|_| TokenError::Malformed("invalid claims encoding"))?;
        let claims: Claims =
            serde_json::from_slice(&claims_bytes).map_err(|_| TokenError::Malformed("invalid claims"))?;

        if claims.exp < now {
            return Err(TokenError::Expired);
        }

        Ok(Identity::new(claims.sub))
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
