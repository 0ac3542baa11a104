use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use passvault::auth::{AuthorizationGate, Identity, Metadata, TokenManager};
use passvault::crypto::Cryptographer;
use passvault::secrets::{PasswordSecret, SecretMetadata, SecretType, SecretVault, TextSecret};
use passvault::service::{get_request, Request, Response, VaultService};
use passvault::storage::{MemorySecretsRepository, MemoryUsersRepository};
use passvault::{Code, ServiceError};

const WINDOW: Duration = Duration::from_secs(15 * 60);

fn tokens() -> Arc<TokenManager> {
    Arc::new(TokenManager::new(b"end-to-end-signing-key", WINDOW).expect("signing key"))
}

fn cryptographer() -> Arc<Cryptographer> {
    Arc::new(Cryptographer::from_key_bytes(&[0x5a; 32]).expect("payload key"))
}

fn service_with(tokens: Arc<TokenManager>) -> VaultService {
    VaultService::new(
        tokens,
        cryptographer(),
        Arc::new(MemorySecretsRepository::new()),
        Arc::new(MemoryUsersRepository::new()),
        vec!["/Auth/".to_string()],
    )
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs()
}

#[test]
fn user_seven_reads_back_their_password_and_user_eight_cannot() {
    let tokens = tokens();
    let service = service_with(tokens.clone());
    let as_user = |id| Metadata::with_bearer(&tokens.generate(Identity::new(id)).expect("token"));

    let saved = service
        .handle(
            &as_user(7),
            Request::SavePassword {
                name: "email".into(),
                secret: PasswordSecret {
                    login: "a".into(),
                    password: "b".into(),
                },
            },
        )
        .expect("save");
    assert_eq!(saved, Response::Empty);

    let fetched = service
        .handle(&as_user(7), get_request(SecretType::Password, "email"))
        .expect("fetch as owner");
    assert_eq!(
        fetched,
        Response::Password(PasswordSecret {
            login: "a".into(),
            password: "b".into(),
        })
    );

    let err = service
        .handle(&as_user(8), get_request(SecretType::Password, "email"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::SecretNotFound(_)));
    assert_eq!(err.code(), Code::NotFound);
}

#[test]
fn token_for_user_three_is_rejected_sixteen_minutes_later() {
    let tokens = tokens();
    let issued_at = now() - 16 * 60;
    let stale = tokens.generate_at(Identity::new(3), issued_at).expect("token");

    let gate = AuthorizationGate::with_default_public_methods(tokens.clone());
    let err = gate
        .authorize("/Secrets/GetText", &Metadata::with_bearer(&stale))
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
    assert!(err.to_string().contains("expired"));

    let fresh = tokens.generate(Identity::new(3)).expect("token");
    let identity = gate
        .authorize("/Secrets/GetText", &Metadata::with_bearer(&fresh))
        .expect("fresh token")
        .expect("identity resolved");
    assert_eq!(identity.user_id, 3);
}

#[test]
fn login_is_open_and_everything_else_is_gated() {
    let service = service_with(tokens());
    service
        .handle(
            &Metadata::new(),
            Request::Register {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .expect("register without metadata");

    let login = service
        .handle(
            &Metadata::new(),
            Request::Login {
                username: "alice".into(),
                password: "pw".into(),
            },
        )
        .expect("login without metadata");
    let token = match login {
        Response::AccessToken(token) => token,
        other => panic!("expected access token, got {other:?}"),
    };

    for kind in SecretType::ALL {
        let err = service
            .handle(&Metadata::new(), get_request(kind, "anything"))
            .unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }

    let err = service
        .handle(&Metadata::with_bearer(&token), get_request(SecretType::Card, "missing"))
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    let err = service
        .handle(
            &Metadata::new(),
            Request::Login {
                username: "alice".into(),
                password: "wrong".into(),
            },
        )
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);
}

#[test]
fn racing_writers_see_exactly_one_success() {
    let vault = Arc::new(SecretVault::new(
        Arc::new(MemorySecretsRepository::new()),
        cryptographer(),
    ));
    let key = SecretMetadata::new(11, SecretType::Text, "shared");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let vault = Arc::clone(&vault);
            let key = key.clone();
            thread::spawn(move || {
                vault.save(
                    &TextSecret {
                        text: format!("writer {i}"),
                    }
                    .into(),
                    &key,
                )
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("writer thread"))
        .collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ServiceError::DuplicateSecret(_))));

    let stored = vault.fetch_text(11, "shared").expect("winner stored");
    assert!(stored.text.starts_with("writer "));
}

#[test]
fn concurrent_readers_share_one_service() {
    let tokens = tokens();
    let service = Arc::new(service_with(tokens.clone()));
    let metadata = Metadata::with_bearer(&tokens.generate(Identity::new(21)).expect("token"));
    service
        .handle(
            &metadata,
            Request::SaveText {
                name: "note".into(),
                secret: TextSecret { text: "shared".into() },
            },
        )
        .expect("save");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let metadata = metadata.clone();
            thread::spawn(move || service.handle(&metadata, get_request(SecretType::Text, "note")))
        })
        .collect();
    for handle in handles {
        let response = handle.join().expect("reader thread").expect("read");
        assert_eq!(response, Response::Text(TextSecret { text: "shared".into() }));
    }
}
