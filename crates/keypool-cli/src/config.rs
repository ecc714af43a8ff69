//! CLI configuration: store connection, pool names, staging file paths.

use std::fmt;
use std::path::PathBuf;

use keypool_reconcile::ProbeConfig;

const ENV_STORE_URL: &str = "KEYPOOL_STORE_URL";
const ENV_STORE_TOKEN: &str = "KEYPOOL_STORE_TOKEN";
const ENV_API_KEY_SET: &str = "KEYPOOL_API_KEY_SET";
const ENV_AUTH_SECRET_SET: &str = "KEYPOOL_AUTH_SECRET_SET";
const ENV_AUTH_EXPIRY_HASH: &str = "KEYPOOL_AUTH_EXPIRY_HASH";
const ENV_STAGING_DIR: &str = "KEYPOOL_STAGING_DIR";

const DEFAULT_API_KEY_SET: &str = "API_KEY_SET";
const DEFAULT_AUTH_SECRET_SET: &str = "AUTH_SECRET_SET";
const DEFAULT_AUTH_EXPIRY_HASH: &str = "AUTH_SECRET_EXPIRATION_HASH";
const DEFAULT_STAGING_DIR: &str = "txt";

/// Errors produced while loading [`CliConfig`].
#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(name) => write!(f, "required environment variable {name} is not set"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Newline-delimited staging files, one token per line.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    /// Candidate tokens to consider during a reconciliation pass.
    pub candidates: PathBuf,
    /// Output: active tokens not yet in the store.
    pub add_keys: PathBuf,
    /// Output: invalid tokens currently in the store.
    pub delete_keys: PathBuf,
    /// Auth secrets to add (with per-token expiry prompt).
    pub add_auths: PathBuf,
    /// Auth secrets to delete.
    pub delete_auths: PathBuf,
    /// Backup snapshot of the expected post-apply membership.
    pub backup: PathBuf,
}

impl StagingPaths {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            candidates: dir.join("allkeys.txt"),
            add_keys: dir.join("add_keys.txt"),
            delete_keys: dir.join("delete_keys.txt"),
            add_auths: dir.join("add_auths.txt"),
            delete_auths: dir.join("delete_auths.txt"),
            backup: dir.join("backup.txt"),
        }
    }
}

/// Full CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Base URL of the Redis-over-REST store (`KEYPOOL_STORE_URL`).
    pub store_url: String,
    /// Bearer token for the store (`KEYPOOL_STORE_TOKEN`).
    pub store_token: String,
    /// Set holding the API key pool. Env: `KEYPOOL_API_KEY_SET`.
    pub api_key_set: String,
    /// Set holding the auth secret pool. Env: `KEYPOOL_AUTH_SECRET_SET`.
    pub auth_secret_set: String,
    /// Hash mapping auth secrets to expiry instants.
    /// Env: `KEYPOOL_AUTH_EXPIRY_HASH`.
    pub auth_expiry_hash: String,
    /// Staging file locations (`KEYPOOL_STAGING_DIR`, default `txt/`).
    pub staging: StagingPaths,
    /// Probe tuning.
    pub probe: ProbeConfig,
}

impl CliConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_url =
            std::env::var(ENV_STORE_URL).map_err(|_| ConfigError::MissingVar(ENV_STORE_URL))?;
        let store_token =
            std::env::var(ENV_STORE_TOKEN).map_err(|_| ConfigError::MissingVar(ENV_STORE_TOKEN))?;

        let api_key_set = var_or(ENV_API_KEY_SET, DEFAULT_API_KEY_SET);
        let auth_secret_set = var_or(ENV_AUTH_SECRET_SET, DEFAULT_AUTH_SECRET_SET);
        let auth_expiry_hash = var_or(ENV_AUTH_EXPIRY_HASH, DEFAULT_AUTH_EXPIRY_HASH);
        let staging_dir = var_or(ENV_STAGING_DIR, DEFAULT_STAGING_DIR);

        Ok(Self {
            store_url,
            store_token,
            api_key_set,
            auth_secret_set,
            auth_expiry_hash,
            staging: StagingPaths::in_dir(staging_dir),
            probe: ProbeConfig::from_env(),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
