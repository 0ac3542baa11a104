//! Request dispatch for the vault's call surface. Every request passes the
//! authorization gate first; handlers receive the caller's [`Identity`] as an
//! explicit argument.

use std::sync::Arc;

use crate::auth::{AuthService, AuthorizationGate, CallContext, Identity, Metadata, TokenManager};
use crate::config::RuntimeConfig;
use crate::crypto::Cryptographer;
use crate::error::ServiceError;
use crate::secrets::{CardSecret, PasswordSecret, Secret, SecretMetadata, SecretType, SecretVault, TextSecret};
use crate::storage::{SecretsRepository, UsersRepository};

#[derive(Clone)]
pub enum Request {
    Register { username: String, password: String },
    Login { username: String, password: String },
    SavePassword { name: String, secret: PasswordSecret },
    SaveCard { name: String, secret: CardSecret },
    SaveText { name: String, secret: TextSecret },
    GetPassword { name: String },
    GetCard { name: String },
    GetText { name: String },
}

impl Request {
    /// Fully qualified method name the gate matches against.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Register { .. } => "/Auth/Register",
            Request::Login { .. } => "/Auth/Login",
            Request::SavePassword { .. } => "/Secrets/SavePassword",
            Request::SaveCard { .. } => "/Secrets/SaveCard",
            Request::SaveText { .. } => "/Secrets/SaveText",
            Request::GetPassword { .. } => "/Secrets/GetPassword",
            Request::GetCard { .. } => "/Secrets/GetCard",
            Request::GetText { .. } => "/Secrets/GetText",
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Register { username, .. } | Request::Login { username, .. } => f
                .debug_struct(self.method())
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Request::SavePassword { name, secret } => {
                f.debug_struct(self.method()).field("name", name).field("secret", secret).finish()
            }
            Request::SaveCard { name, secret } => {
                f.debug_struct(self.method()).field("name", name).field("secret", secret).finish()
            }
            Request::SaveText { name, secret } => {
                f.debug_struct(self.method()).field("name", name).field("secret", secret).finish()
            }
            Request::GetPassword { name } | Request::GetCard { name } | Request::GetText { name } => {
                f.debug_struct(self.method()).field("name", name).finish()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    AccessToken(String),
    Empty,
    Password(PasswordSecret),
    Card(CardSecret),
    Text(TextSecret),
}

pub struct VaultService {
    gate: AuthorizationGate,
    tokens: Arc<TokenManager>,
    auth: AuthService,
    vault: SecretVault,
}

impl VaultService {
    pub fn new(
        tokens: Arc<TokenManager>,
        cryptographer: Arc<Cryptographer>,
        secrets: Arc<dyn SecretsRepository>,
        users: Arc<dyn UsersRepository>,
        public_prefixes: Vec<String>,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(tokens.clone(), public_prefixes),
            tokens,
            auth: AuthService::new(users),
            vault: SecretVault::new(secrets, cryptographer),
        }
    }

    pub fn from_config(
        config: RuntimeConfig,
        secrets: Arc<dyn SecretsRepository>,
        users: Arc<dyn UsersRepository>,
    ) -> Self {
        Self::new(
            config.token_manager,
            config.cryptographer,
            secrets,
            users,
            config.public_method_prefixes,
        )
    }

    pub fn vault(&self) -> &SecretVault {
        &self.vault
    }

    /// Serves one call: authorize, dispatch, convert panics to `Internal`.
    pub fn handle(&self, metadata: &Metadata, request: Request) -> Result<Response, ServiceError> {
        let method = request.method();
        self.gate
            .intercept(method, metadata, |ctx| self.dispatch(ctx, request))
    }

    fn dispatch(&self, ctx: &CallContext, request: Request) -> Result<Response, ServiceError> {
        match request {
            Request::Register { username, password } => {
                let user = self.auth.register(&username, &password)?;
                self.issue_token(user.id)
            }
            Request::Login { username, password } => {
                let user = self.auth.login(&username, &password)?;
                self.issue_token(user.id)
            }
            Request::SavePassword { name, secret } => self.save(ctx.identity()?, name, secret.into()),
            Request::SaveCard { name, secret } => self.save(ctx.identity()?, name, secret.into()),
            Request::SaveText { name, secret } => self.save(ctx.identity()?, name, secret.into()),
            Request::GetPassword { name } => self
                .vault
                .fetch_password(ctx.identity()?.user_id, &name)
                .map(Response::Password),
            Request::GetCard { name } => self
                .vault
                .fetch_card(ctx.identity()?.user_id, &name)
                .map(Response::Card),
            Request::GetText { name } => self
                .vault
                .fetch_text(ctx.identity()?.user_id, &name)
                .map(Response::Text),
        }
    }

    fn issue_token(&self, user_id: i64) -> Result<Response, ServiceError> {
        let token = self
            .tokens
            .generate(Identity::new(user_id))
            .map_err(|e| ServiceError::internal(format!("cannot generate access token: {e}")))?;
        Ok(Response::AccessToken(token))
    }

    fn save(&self, identity: Identity, name: String, secret: Secret) -> Result<Response, ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("secret name must not be empty".into()));
        }
        let metadata = SecretMetadata::new(identity.user_id, secret.kind(), name);
        self.vault.save(&secret, &metadata)?;
        Ok(Response::Empty)
    }
}

/// Maps a secret kind to the request that fetches it.
pub fn get_request(kind: SecretType, name: impl Into<String>) -> Request {
    let name = name.into();
    match kind {
        SecretType::Password => Request::GetPassword { name },
        SecretType::Card => Request::GetCard { name },
        SecretType::Text => Request::GetText { name },
    }
}

#[cfg(test)]
mod tests {
    use super::{get_request, Request, Response, VaultService};
    use crate::auth::gate::DEFAULT_PUBLIC_PREFIXES;
    use crate::auth::{Metadata, TokenManager};
    use crate::crypto::Cryptographer;
    use crate::error::{Code, ServiceError};
    use crate::secrets::{PasswordSecret, SecretType, TextSecret};
    use crate::storage::{MemorySecretsRepository, MemoryUsersRepository};
    use std::sync::Arc;
    use std::time::Duration;

    fn service() -> VaultService {
        VaultService::new(
            Arc::new(TokenManager::new(b"service-test-key", Duration::from_secs(900)).expect("key")),
            Arc::new(Cryptographer::from_key_bytes(&[5u8; 32]).expect("key")),
            Arc::new(MemorySecretsRepository::new()),
            Arc::new(MemoryUsersRepository::new()),
            DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn token_of(response: Response) -> String {
        match response {
            Response::AccessToken(token) => token,
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[test]
    fn register_needs_no_metadata_and_returns_a_token() {
        let svc = service();
        let token = token_of(
            svc.handle(
                &Metadata::new(),
                Request::Register {
                    username: "alice".into(),
                    password: "pw".into(),
                },
            )
            .expect("register"),
        );
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn secret_calls_without_token_are_unauthenticated() {
        let svc = service();
        let err = svc
            .handle(&Metadata::new(), get_request(SecretType::Text, "note"))
            .unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }

    #[test]
    fn saves_and_reads_back_through_the_gate() {
        let svc = service();
        let token = token_of(
            svc.handle(
                &Metadata::new(),
                Request::Register {
                    username: "alice".into(),
                    password: "pw".into(),
                },
            )
            .expect("register"),
        );
        let md = Metadata::with_bearer(&token);
        let note = TextSecret { text: "hello".into() };

        assert_eq!(
            svc.handle(
                &md,
                Request::SaveText {
                    name: "note".into(),
                    secret: note.clone()
                }
            )
            .expect("save"),
            Response::Empty
        );
        assert_eq!(
            svc.handle(&md, get_request(SecretType::Text, "note")).expect("get"),
            Response::Text(note)
        );
    }

    #[test]
    fn empty_names_are_rejected() {
        let svc = service();
        let token = token_of(
            svc.handle(
                &Metadata::new(),
                Request::Register {
                    username: "bob".into(),
                    password: "pw".into(),
                },
            )
            .expect("register"),
        );
        let err = svc
            .handle(
                &Metadata::with_bearer(&token),
                Request::SaveText {
                    name: String::new(),
                    secret: TextSecret { text: "x".into() },
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn method_names_follow_service_prefixes() {
        assert_eq!(
            Request::Login {
                username: String::new(),
                password: String::new()
            }
            .method(),
            "/Auth/Login"
        );
        assert_eq!(get_request(SecretType::Card, "c").method(), "/Secrets/GetCard");
    }

    #[test]
    fn debug_output_hides_account_and_secret_passwords() {
        let login = Request::Login {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{login:?}");
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));

        let save = Request::SavePassword {
            name: "email".into(),
            secret: PasswordSecret {
                login: "a@example.com".into(),
                password: "hunter2".into(),
            },
        };
        assert!(!format!("{save:?}").contains("hunter2"));
    }
}
