//! The CLI's operator actions, generic over the store backend.
//!
//! Each action is one curation step: compute a reconciliation plan, apply a
//! staged file to the store, or sweep expired auth secrets. Actions that
//! apply a staging file truncate it only after every store write succeeded,
//! so a failed run can simply be retried.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use keypool_reconcile::{now_epoch_secs, run_pass, sweep, PassReport};
use keypool_store::{KvStore, Token};
use reqwest::Client;

use crate::config::CliConfig;
use crate::staging;

const SECS_PER_DAY: i64 = 86_400;

/// Errors produced by CLI actions.
#[derive(Debug)]
pub enum ActionError {
    /// A store operation failed. Carries the backend's error message.
    Store(String),
    /// A staging file could not be read or written.
    Io(io::Error),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::Io(e) => write!(f, "staging file error: {e}"),
        }
    }
}

impl std::error::Error for ActionError {}

impl From<io::Error> for ActionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

fn store_err(err: impl std::error::Error) -> ActionError {
    ActionError::Store(err.to_string())
}

/// Outcome of applying one staging file to the store.
#[derive(Debug, Clone, Copy)]
pub struct ApplyOutcome {
    /// Tokens read from the staging file (duplicates included).
    pub staged: usize,
    /// Members the store actually inserted or removed.
    pub applied: u64,
}

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepOutcome {
    /// Entries scanned in the expiry hash.
    pub scanned: usize,
    /// Entries whose expiry had elapsed (or was unreadable).
    pub expired: usize,
    /// Members actually removed from the auth secret set.
    pub removed_from_set: u64,
    /// Fields actually deleted from the expiry hash.
    pub removed_from_hash: u64,
}

/// Outcome of deduplicating the candidates file in place.
#[derive(Debug, Clone, Copy)]
pub struct DedupOutcome {
    /// Lines read from the file.
    pub read: usize,
    /// Unique tokens written back.
    pub unique: usize,
}

/// Probe the key pool plus any staged candidates and stage the resulting
/// plan: `to_add` and `to_remove` land in their staging files, and the
/// expected post-apply membership is written to the backup file.
///
/// The store itself is not mutated; the operator applies the plan with
/// `add-keys` / `delete-keys` after reviewing the staged files.
pub async fn check_keys<S: KvStore>(
    store: &S,
    http: &Client,
    config: &CliConfig,
) -> Result<PassReport, ActionError> {
    let staged: BTreeSet<Token> = staging::load_tokens(&config.staging.candidates)?
        .into_iter()
        .collect();

    let report = run_pass(store, &config.api_key_set, &staged, http, &config.probe)
        .await
        .map_err(store_err)?;

    staging::write_tokens(&config.staging.add_keys, &report.plan.to_add)?;
    staging::write_tokens(&config.staging.delete_keys, &report.plan.to_remove)?;
    staging::write_tokens(&config.staging.backup, &report.expected_members())?;

    Ok(report)
}

/// Add the staged keys to the key pool, then truncate the staging file.
pub async fn add_keys<S: KvStore>(store: &S, config: &CliConfig) -> Result<ApplyOutcome, ActionError> {
    let tokens = staging::load_tokens(&config.staging.add_keys)?;
    if tokens.is_empty() {
        return Ok(ApplyOutcome { staged: 0, applied: 0 });
    }

    let applied = store
        .set_add(&config.api_key_set, &tokens)
        .await
        .map_err(store_err)?;
    staging::truncate(&config.staging.add_keys)?;

    tracing::info!(staged = tokens.len(), added = applied, set = %config.api_key_set, "keys added");
    Ok(ApplyOutcome { staged: tokens.len(), applied })
}

/// Remove the staged keys from the key pool, then truncate the staging file.
pub async fn delete_keys<S: KvStore>(
    store: &S,
    config: &CliConfig,
) -> Result<ApplyOutcome, ActionError> {
    let tokens = staging::load_tokens(&config.staging.delete_keys)?;
    if tokens.is_empty() {
        return Ok(ApplyOutcome { staged: 0, applied: 0 });
    }

    let applied = store
        .set_remove(&config.api_key_set, &tokens)
        .await
        .map_err(store_err)?;
    staging::truncate(&config.staging.delete_keys)?;

    tracing::info!(staged = tokens.len(), removed = applied, set = %config.api_key_set, "keys removed");
    Ok(ApplyOutcome { staged: tokens.len(), applied })
}

/// Add the staged auth secrets with a per-token expiry.
///
/// `days_for` supplies the lifetime in days for each token — the interactive
/// menu prompts the operator, tests pass a closure. The expiry is recorded
/// as epoch seconds in the expiry hash alongside the set insertion.
pub async fn add_auths<S, F>(
    store: &S,
    config: &CliConfig,
    mut days_for: F,
) -> Result<ApplyOutcome, ActionError>
where
    S: KvStore,
    F: FnMut(&Token) -> u64,
{
    let tokens = staging::load_tokens(&config.staging.add_auths)?;
    if tokens.is_empty() {
        return Ok(ApplyOutcome { staged: 0, applied: 0 });
    }

    let mut applied = 0u64;
    for token in &tokens {
        let days = days_for(token);
        let expiry = now_epoch_secs() + days as i64 * SECS_PER_DAY;

        applied += store
            .set_add(&config.auth_secret_set, std::slice::from_ref(token))
            .await
            .map_err(store_err)?;
        store
            .hash_set(&config.auth_expiry_hash, token, &expiry.to_string())
            .await
            .map_err(store_err)?;
    }
    staging::truncate(&config.staging.add_auths)?;

    tracing::info!(staged = tokens.len(), added = applied, set = %config.auth_secret_set, "auth secrets added");
    Ok(ApplyOutcome { staged: tokens.len(), applied })
}

/// Remove the staged auth secrets from both the set and the expiry hash,
/// then truncate the staging file.
pub async fn delete_auths<S: KvStore>(
    store: &S,
    config: &CliConfig,
) -> Result<ApplyOutcome, ActionError> {
    let tokens = staging::load_tokens(&config.staging.delete_auths)?;
    if tokens.is_empty() {
        return Ok(ApplyOutcome { staged: 0, applied: 0 });
    }

    let applied = store
        .set_remove(&config.auth_secret_set, &tokens)
        .await
        .map_err(store_err)?;
    store
        .hash_delete(&config.auth_expiry_hash, &tokens)
        .await
        .map_err(store_err)?;
    staging::truncate(&config.staging.delete_auths)?;

    tracing::info!(staged = tokens.len(), removed = applied, set = %config.auth_secret_set, "auth secrets removed");
    Ok(ApplyOutcome { staged: tokens.len(), applied })
}

/// Sweep the expiry hash and remove elapsed (or unreadable) entries from
/// both the auth secret set and the hash itself.
pub async fn check_expired_auths<S: KvStore>(
    store: &S,
    config: &CliConfig,
) -> Result<SweepOutcome, ActionError> {
    let expiries = store
        .hash_get_all(&config.auth_expiry_hash)
        .await
        .map_err(store_err)?;
    let scanned = expiries.len();

    let expired: Vec<Token> = sweep(&expiries, now_epoch_secs()).into_iter().collect();
    if expired.is_empty() {
        return Ok(SweepOutcome {
            scanned,
            expired: 0,
            removed_from_set: 0,
            removed_from_hash: 0,
        });
    }

    let removed_from_set = store
        .set_remove(&config.auth_secret_set, &expired)
        .await
        .map_err(store_err)?;
    let removed_from_hash = store
        .hash_delete(&config.auth_expiry_hash, &expired)
        .await
        .map_err(store_err)?;

    tracing::info!(
        scanned,
        expired = expired.len(),
        removed_from_set,
        removed_from_hash,
        "expiry sweep complete"
    );
    Ok(SweepOutcome {
        scanned,
        expired: expired.len(),
        removed_from_set,
        removed_from_hash,
    })
}

/// Deduplicate and sort the candidates file in place. A file-only operation;
/// the store is never touched.
pub fn dedup_keys(config: &CliConfig) -> Result<DedupOutcome, ActionError> {
    let tokens = staging::load_tokens(&config.staging.candidates)?;
    let unique: BTreeSet<Token> = tokens.iter().cloned().collect();

    staging::write_tokens(&config.staging.candidates, &unique)?;
    Ok(DedupOutcome {
        read: tokens.len(),
        unique: unique.len(),
    })
}
