//! Configuration loader. The file never holds key material itself, only where
//! to find it: an environment variable, a key file, a passphrase plus salt, or
//! one master secret from which the token and payload keys are derived.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroize;

use crate::auth::gate::DEFAULT_PUBLIC_PREFIXES;
use crate::auth::token::{TokenManager, DEFAULT_VALIDITY};
use crate::crypto::cipher::{decode_key_b64, Cryptographer, KEY_LEN};
use crate::crypto::integrity::hkdf_expand;

const MASTER_SALT: &[u8] = b"passvault/v1";
const TOKEN_KEY_INFO: &[u8] = b"passvault token signing";
const PAYLOAD_KEY_INFO: &[u8] = b"passvault payload encryption";

pub const ENV_TOKEN_KEY: &str = "PASSVAULT_TOKEN_KEY";
pub const ENV_VAULT_KEY: &str = "PASSVAULT_VAULT_KEY";
pub const ENV_MASTER_KEY: &str = "PASSVAULT_MASTER_KEY";
pub const ENV_TOKEN_TTL: &str = "PASSVAULT_TOKEN_TTL_SECS";
pub const ENV_LOG_LEVEL: &str = "PASSVAULT_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("key material error: {0}")]
    Key(String),
    #[error("no usable key source configured for {0}")]
    MissingKeySource(&'static str),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    /// Environment variable holding the base64 signing key.
    pub key_env: Option<String>,
    /// File holding the base64 signing key.
    pub key_path: Option<PathBuf>,
    #[serde(default = "default_validity_secs")]
    pub validity_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            key_env: None,
            key_path: None,
            validity_secs: default_validity_secs(),
        }
    }
}

fn default_validity_secs() -> u64 {
    DEFAULT_VALIDITY.as_secs()
}

#[derive(Debug, Default, Deserialize)]
pub struct VaultConfig {
    /// Base64-encoded 32 byte key stored in an environment variable.
    pub key_env: Option<String>,
    /// Path to a file that contains the base64-encoded key.
    pub key_path: Option<PathBuf>,
    /// Environment variable that stores a passphrase (for Argon2id KDF).
    pub passphrase_env: Option<String>,
    /// Base64-encoded salt used alongside the passphrase.
    pub salt_b64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(rename = "masterKeyEnv")]
    pub master_key_env: Option<String>,
    #[serde(rename = "publicMethods", default = "default_public_methods")]
    pub public_methods: Vec<String>,
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,
}

fn default_public_methods() -> Vec<String> {
    DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved configuration: keys are loaded, components are built.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub token_manager: Arc<TokenManager>,
    pub cryptographer: Arc<Cryptographer>,
    pub public_method_prefixes: Vec<String>,
    pub log_level: String,
}

impl Settings {
    /// Settings from `PASSVAULT_*` variables; key variables are referenced, not copied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let present = |name: &str| std::env::var_os(name).map(|_| name.to_string());

        let validity_secs = match std::env::var(ENV_TOKEN_TTL) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue(format!("{ENV_TOKEN_TTL}: {e}")))?,
            Err(_) => default_validity_secs(),
        };

        Ok(Self {
            tokens: TokenConfig {
                key_env: present(ENV_TOKEN_KEY),
                key_path: None,
                validity_secs,
            },
            vault: VaultConfig {
                key_env: present(ENV_VAULT_KEY),
                ..VaultConfig::default()
            },
            master_key_env: present(ENV_MASTER_KEY),
            public_methods: default_public_methods(),
            log_level: std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| default_log_level()),
        })
    }

    /// Loads key material and builds the runtime components.
    pub fn build(self) -> Result<RuntimeConfig, ConfigError> {
        if self.tokens.validity_secs == 0 {
            return Err(ConfigError::InvalidValue("tokens.validity_secs must be positive".into()));
        }

        let mut master = match &self.master_key_env {
            Some(var) => Some(read_env_key(var)?),
            None => None,
        };

        let token_manager = self.build_token_manager(master.as_deref());
        let cryptographer = self.build_cryptographer(master.as_deref());
        if let Some(bytes) = master.as_mut() {
            bytes.zeroize();
        }

        Ok(RuntimeConfig {
            token_manager: Arc::new(token_manager?),
            cryptographer: Arc::new(cryptographer?),
            public_method_prefixes: self.public_methods,
            log_level: self.log_level,
        })
    }

    fn build_token_manager(&self, master: Option<&[u8]>) -> Result<TokenManager, ConfigError> {
        let mut key = if let Some(var) = &self.tokens.key_env {
            read_env_key(var)?
        } else if let Some(path) = &self.tokens.key_path {
            read_file_key(path)?
        } else if let Some(master) = master {
            derive(master, TOKEN_KEY_INFO)?
        } else {
            return Err(ConfigError::MissingKeySource("tokens"));
        };

        let validity = Duration::from_secs(self.tokens.validity_secs);
        let built = TokenManager::new(&key, validity).map_err(|e| ConfigError::Key(format!("{e}")));
        key.zeroize();
        built
    }

    fn build_cryptographer(&self, master: Option<&[u8]>) -> Result<Cryptographer, ConfigError> {
        let vault = &self.vault;
        if let Some(var) = &vault.key_env {
            return Cryptographer::from_env_var(var).map_err(|e| ConfigError::Key(format!("{e}")));
        }
        if let Some(path) = &vault.key_path {
            return Cryptographer::from_key_file(path).map_err(|e| ConfigError::Key(format!("{e}")));
        }
        if let (Some(pass_env), Some(salt_b64)) = (&vault.passphrase_env, &vault.salt_b64) {
            let passphrase = std::env::var(pass_env)
                .map_err(|e| ConfigError::Key(format!("{pass_env}: {e}")))?;
            let salt = decode_key_b64(salt_b64).map_err(|e| ConfigError::Key(format!("{e}")))?;
            return Cryptographer::derive_from_passphrase(&passphrase, &salt)
                .map_err(|e| ConfigError::Key(format!("{e}")));
        }
        if let Some(master) = master {
            let mut key = derive(master, PAYLOAD_KEY_INFO)?;
            let built = Cryptographer::from_key_bytes(&key).map_err(|e| ConfigError::Key(format!("{e}")));
            key.zeroize();
            return built;
        }
        Err(ConfigError::MissingKeySource("vault"))
    }
}

fn read_env_key(var: &str) -> Result<Vec<u8>, ConfigError> {
    let encoded = std::env::var(var).map_err(|e| ConfigError::Key(format!("{var}: {e}")))?;
    let decoded = decode_key_b64(&encoded).map_err(|e| ConfigError::Key(format!("{var}: {e}")))?;
    if decoded.is_empty() {
        return Err(ConfigError::Key(format!("{var}: key is empty")));
    }
    Ok(decoded)
}

fn read_file_key(path: &Path) -> Result<Vec<u8>, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::Key(format!("{}: {e}", path.display())))?;
    decode_key_b64(&content).map_err(|e| ConfigError::Key(format!("{}: {e}", path.display())))
}

fn derive(master: &[u8], info: &[u8]) -> Result<Vec<u8>, ConfigError> {
    hkdf_expand(master, MASTER_SALT, info, KEY_LEN).map_err(|e| ConfigError::Key(format!("{e}")))
}

/// Loads the JSON configuration file and resolves every key source.
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let settings: Settings = serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    settings.build()
}
