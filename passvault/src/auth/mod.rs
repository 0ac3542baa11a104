//! Authentication: access tokens, the per-call authorization gate, and the
//! register/login flow that issues tokens in the first place.

pub mod gate;
pub mod service;
pub mod token;

pub use gate::{AuthorizationGate, CallContext, Metadata};
pub use service::AuthService;
pub use token::{TokenError, TokenManager};

/// The authenticated user behind one call. Resolved per request, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    pub user_id: i64,
}

impl Identity {
    pub fn new(user_id: i64) -> Self {
        Self { user_id }
    }
}
