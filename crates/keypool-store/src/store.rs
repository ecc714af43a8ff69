//! [`KvStore`] trait — the store contract the reconciliation engine requires.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use crate::token::Token;

/// Minimal set/hash capability of the external key-value store.
///
/// Implementations must be `Send + Sync` so they can be shared across async
/// tasks. All operations are idempotent at the store: adding an existing set
/// member or removing an absent one is a no-op, and the returned counts
/// reflect only the members actually inserted or removed.
pub trait KvStore: Send + Sync {
    /// The error type returned by all store operations.
    type Error: std::error::Error + Send + Sync;

    /// Read the full membership of the named set.
    fn set_members(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<Token>, Self::Error>> + Send;

    /// Add tokens to the named set. Returns the number of newly-inserted
    /// members (existing members contribute 0).
    fn set_add(
        &self,
        name: &str,
        tokens: &[Token],
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Remove tokens from the named set. Returns the number of members
    /// actually removed (absent members contribute 0).
    fn set_remove(
        &self,
        name: &str,
        tokens: &[Token],
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Read the full contents of the named hash. Values are stringified
    /// expiry instants that still require parsing.
    fn hash_get_all(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BTreeMap<Token, String>, Self::Error>> + Send;

    /// Set one field of the named hash.
    fn hash_set(
        &self,
        name: &str,
        token: &Token,
        value: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Delete fields from the named hash. Returns the number of fields
    /// actually deleted.
    fn hash_delete(
        &self,
        name: &str,
        tokens: &[Token],
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}
