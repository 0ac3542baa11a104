//! Operator CLI for the vault core. Commands mirror what a deployment needs to
//! check by hand: key configuration, token issue/verify, and a local dry run.

use std::env;
use std::sync::Arc;

use passvault::auth::{Identity, Metadata};
use passvault::config::{load_config, RuntimeConfig, Settings};
use passvault::crypto::passwords::hash_password;
use passvault::secrets::{PasswordSecret, SecretType};
use passvault::service::{get_request, Request, Response, VaultService};
use passvault::storage::{MemorySecretsRepository, MemoryUsersRepository};
use passvault::telemetry;
use serde_json::json;

fn print_usage() {
    eprintln!("Commands:\n  hash-password <plaintext>\n  issue-token <config|-> <user-id>\n  verify-token <config|-> <token>\n  check-config <config|->\n  demo <config|->\n\nUse `-` to read settings from PASSVAULT_* environment variables.");
}

fn load(source: &str) -> Result<RuntimeConfig, String> {
    let loaded = if source == "-" {
        Settings::from_env().and_then(Settings::build)
    } else {
        load_config(source)
    };
    loaded.map_err(|e| format!("config load failed: {e}"))
}

fn print_json(value: serde_json::Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(&value).map_err(|e| format!("output failed: {e}"))?;
    println!("{text}");
    Ok(())
}

fn run(args: &[String]) -> Result<(), String> {
    match (args.get(1).map(String::as_str), args.len()) {
        (Some("hash-password"), 3) => {
            let hash = hash_password(&args[2]).map_err(|e| format!("hashing failed: {e}"))?;
            println!("{hash}");
            Ok(())
        }
        (Some("issue-token"), 4) => {
            let config = load(&args[2])?;
            telemetry::init(&config.log_level);
            let user_id: i64 = args[3].parse().map_err(|e| format!("invalid user id: {e}"))?;
            let token = config
                .token_manager
                .generate(Identity::new(user_id))
                .map_err(|e| format!("token generation failed: {e}"))?;
            println!("{token}");
            Ok(())
        }
        (Some("verify-token"), 4) => {
            let config = load(&args[2])?;
            telemetry::init(&config.log_level);
            match config.token_manager.verify(&args[3]) {
                Ok(identity) => print_json(json!({ "valid": true, "userId": identity.user_id })),
                Err(err) => print_json(json!({ "valid": false, "reason": err.to_string() })),
            }
        }
        (Some("check-config"), 3) => {
            let config = load(&args[2])?;
            print_json(json!({
                "tokenValiditySecs": config.token_manager.validity().as_secs(),
                "publicMethods": config.public_method_prefixes,
                "logLevel": config.log_level,
                "keys": "<loaded, redacted in output>"
            }))
        }
        (Some("demo"), 3) => {
            let config = load(&args[2])?;
            telemetry::init(&config.log_level);
            demo(config)
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

/// Registers a user, stores a password secret and reads it back, all against
/// in-memory repositories.
fn demo(config: RuntimeConfig) -> Result<(), String> {
    let service = VaultService::from_config(
        config,
        Arc::new(MemorySecretsRepository::new()),
        Arc::new(MemoryUsersRepository::new()),
    );
    let call = |metadata: &Metadata, request: Request| {
        let method = request.method();
        service
            .handle(metadata, request)
            .map_err(|e| format!("{method} failed ({}): {e}", e.code().as_str()))
    };

    let token = match call(
        &Metadata::new(),
        Request::Register {
            username: "demo".into(),
            password: "demo-password".into(),
        },
    )? {
        Response::AccessToken(token) => token,
        other => return Err(format!("unexpected register response: {other:?}")),
    };
    let metadata = Metadata::with_bearer(&token);

    call(
        &metadata,
        Request::SavePassword {
            name: "email".into(),
            secret: PasswordSecret {
                login: "demo@example.com".into(),
                password: "correct horse".into(),
            },
        },
    )?;
    let fetched = call(&metadata, get_request(SecretType::Password, "email"))?;
    let unauthenticated = call(&Metadata::new(), get_request(SecretType::Password, "email"));

    let round_trip = matches!(fetched, Response::Password(ref p) if p.login == "demo@example.com");

    print_json(json!({
        "registered": true,
        "roundTrip": round_trip,
        "anonymousFetchRejected": unauthenticated.is_err()
    }))
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(error) = run(&args) {
        eprintln!("passvault: {error}");
        std::process::exit(1);
    }
}
