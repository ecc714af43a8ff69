//! In-memory [`KvStore`] backend backed by `Arc<Mutex<HashMap>>`.
//!
//! Suitable for tests and local development — no persistence, no network.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::store::KvStore;
use crate::token::Token;

/// Error type for [`MemoryStore`].
///
/// The in-memory backend cannot actually fail; the type exists to satisfy
/// the trait contract.
#[derive(Debug)]
pub struct MemoryStoreError(String);

impl fmt::Display for MemoryStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryStore error: {}", self.0)
    }
}

impl std::error::Error for MemoryStoreError {}

#[derive(Default)]
struct Inner {
    sets: HashMap<String, BTreeSet<Token>>,
    hashes: HashMap<String, BTreeMap<Token, String>>,
}

/// Thread-safe in-memory set/hash store.
///
/// `Clone` shares the underlying state, so a clone handed to a task observes
/// the same data as the original.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a set member without `await` — test convenience.
    pub fn seed_set(&self, name: &str, token: &Token) {
        self.inner
            .lock()
            .unwrap()
            .sets
            .entry(name.to_string())
            .or_default()
            .insert(token.clone());
    }

    /// Seed a hash entry without `await` — test convenience.
    pub fn seed_hash(&self, name: &str, token: &Token, value: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .hashes
            .entry(name.to_string())
            .or_default()
            .insert(token.clone(), value.into());
    }

    /// Current size of the named set (0 if absent).
    pub fn set_len(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .sets
            .get(name)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Current size of the named hash (0 if absent).
    pub fn hash_len(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .hashes
            .get(name)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

impl KvStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn set_members(&self, name: &str) -> Result<BTreeSet<Token>, Self::Error> {
        let guard = self.inner.lock().unwrap();
        Ok(guard.sets.get(name).cloned().unwrap_or_default())
    }

    async fn set_add(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let mut guard = self.inner.lock().unwrap();
        let set = guard.sets.entry(name.to_string()).or_default();
        let mut added = 0u64;
        for token in tokens {
            if set.insert(token.clone()) {
                added += 1;
            }
        }
        Ok(added)
    }

    async fn set_remove(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let mut guard = self.inner.lock().unwrap();
        let Some(set) = guard.sets.get_mut(name) else {
            return Ok(0);
        };
        let mut removed = 0u64;
        for token in tokens {
            if set.remove(token) {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn hash_get_all(&self, name: &str) -> Result<BTreeMap<Token, String>, Self::Error> {
        let guard = self.inner.lock().unwrap();
        Ok(guard.hashes.get(name).cloned().unwrap_or_default())
    }

    async fn hash_set(&self, name: &str, token: &Token, value: &str) -> Result<(), Self::Error> {
        self.inner
            .lock()
            .unwrap()
            .hashes
            .entry(name.to_string())
            .or_default()
            .insert(token.clone(), value.to_string());
        Ok(())
    }

    async fn hash_delete(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let mut guard = self.inner.lock().unwrap();
        let Some(hash) = guard.hashes.get_mut(name) else {
            return Ok(0);
        };
        let mut deleted = 0u64;
        for token in tokens {
            if hash.remove(token).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    #[tokio::test]
    async fn set_add_counts_only_new_members() {
        let store = MemoryStore::new();
        let added = store
            .set_add("pool", &[tok("k1"), tok("k2")])
            .await
            .unwrap();
        assert_eq!(added, 2);

        // Re-adding k2 plus one new member: only the new one counts.
        let added = store
            .set_add("pool", &[tok("k2"), tok("k3")])
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(store.set_len("pool"), 3);
    }

    /// Scenario C: adding an existing member returns count 0 and the set is
    /// unchanged — no duplication.
    #[tokio::test]
    async fn set_add_existing_member_is_noop() {
        let store = MemoryStore::new();
        store
            .set_add("pool", &[tok("k1"), tok("k2"), tok("k3")])
            .await
            .unwrap();

        let added = store.set_add("pool", &[tok("k3")]).await.unwrap();
        assert_eq!(added, 0);

        let members = store.set_members("pool").await.unwrap();
        let names: Vec<&str> = members.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn set_remove_absent_member_is_noop() {
        let store = MemoryStore::new();
        store.set_add("pool", &[tok("k1")]).await.unwrap();

        let removed = store
            .set_remove("pool", &[tok("k1"), tok("missing")])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.set_len("pool"), 0);
    }

    #[tokio::test]
    async fn set_remove_on_missing_set_returns_zero() {
        let store = MemoryStore::new();
        let removed = store.set_remove("nope", &[tok("k1")]).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn empty_token_slice_short_circuits() {
        let store = MemoryStore::new();
        assert_eq!(store.set_add("pool", &[]).await.unwrap(), 0);
        assert_eq!(store.set_remove("pool", &[]).await.unwrap(), 0);
        assert_eq!(store.hash_delete("h", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn hash_set_get_delete() {
        let store = MemoryStore::new();
        store.hash_set("exp", &tok("k1"), "100").await.unwrap();
        store.hash_set("exp", &tok("k2"), "200").await.unwrap();

        let all = store.hash_get_all("exp").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get(&tok("k1")).map(String::as_str), Some("100"));

        let deleted = store
            .hash_delete("exp", &[tok("k1"), tok("missing")])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.hash_len("exp"), 1);
    }

    #[tokio::test]
    async fn hash_set_overwrites_existing_value() {
        let store = MemoryStore::new();
        store.hash_set("exp", &tok("k1"), "100").await.unwrap();
        store.hash_set("exp", &tok("k1"), "999").await.unwrap();
        let all = store.hash_get_all("exp").await.unwrap();
        assert_eq!(all.get(&tok("k1")).map(String::as_str), Some("999"));
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::new();
        store.seed_set("pool", &tok("k1"));

        let clone = store.clone();
        let members = clone.set_members("pool").await.unwrap();
        assert!(members.contains(&tok("k1")));
    }

    #[tokio::test]
    async fn missing_set_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.set_members("nope").await.unwrap().is_empty());
        assert!(store.hash_get_all("nope").await.unwrap().is_empty());
    }
}
