//! Per-call authorization. Every inbound method except the public login and
//! register calls must carry an `authorization` entry holding a valid token;
//! the resolved identity is handed to the handler through [`CallContext`].

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, info, warn};

use super::token::TokenManager;
use super::Identity;
use crate::error::ServiceError;

pub const AUTHORIZATION_KEY: &str = "authorization";

/// Method prefixes that skip token checks by default.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &["/Auth/"];

/// String-keyed, multi-valued call metadata. Keys are case-insensitive.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    entries: HashMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`, keeping earlier values.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Outgoing-call helper: metadata carrying `token` as the authorization entry.
    pub fn with_bearer(token: &str) -> Self {
        let mut metadata = Self::new();
        metadata.append(AUTHORIZATION_KEY, format!("Bearer {token}"));
        metadata
    }
}

/// Accepts both `Bearer <token>` and a bare token.
pub fn extract_bearer_token(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .unwrap_or(value)
}

/// What a handler learns about the call it is serving.
#[derive(Clone, Debug)]
pub struct CallContext {
    method: String,
    identity: Option<Identity>,
}

impl CallContext {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The caller's identity; public methods have none.
    pub fn identity(&self) -> Result<Identity, ServiceError> {
        self.identity
            .ok_or_else(|| ServiceError::unauthenticated("call has no authenticated identity"))
    }
}

#[derive(Clone)]
pub struct AuthorizationGate {
    tokens: Arc<TokenManager>,
    public_prefixes: Vec<String>,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenManager>, public_prefixes: Vec<String>) -> Self {
        Self {
            tokens,
            public_prefixes,
        }
    }

    pub fn with_default_public_methods(tokens: Arc<TokenManager>) -> Self {
        Self::new(
            tokens,
            DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn is_public(&self, method: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| method.starts_with(prefix.as_str()))
    }

    /// Resolves the caller of `method`. Public methods resolve to `None`.
    pub fn authorize(&self, method: &str, metadata: &Metadata) -> Result<Option<Identity>, ServiceError> {
        if self.is_public(method) {
            return Ok(None);
        }

        let raw = metadata
            .get(AUTHORIZATION_KEY)
            .ok_or_else(|| ServiceError::unauthenticated("authorization token is not provided"))?;

        match self.tokens.verify(extract_bearer_token(raw)) {
            Ok(identity) => Ok(Some(identity)),
            Err(err) => {
                warn!(method, reason = %err, "rejecting call with invalid token");
                Err(err.into())
            }
        }
    }

    /// Authorizes the call, then runs `handler` inside a recovery boundary so
    /// a panicking handler yields `Internal` instead of unwinding further.
    pub fn intercept<T, F>(&self, method: &str, metadata: &Metadata, handler: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&CallContext) -> Result<T, ServiceError>,
    {
        info!(method, "--> unary interceptor");
        let identity = self.authorize(method, metadata)?;
        let context = CallContext {
            method: method.to_string(),
            identity,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(&context))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(method, %reason, "handler panicked");
                Err(ServiceError::internal("request handler failed"))
            }
        }
    }
}
