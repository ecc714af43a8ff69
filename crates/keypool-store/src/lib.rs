//! Key-value store contract and backends for the keypool credential pools.
//!
//! Credential pools live in an external set/hash store: one set per pool
//! (API keys, auth secrets) plus a hash mapping tokens to expiry instants.
//! This crate defines the minimal [`KvStore`] capability the reconciliation
//! engine needs, and two backends:
//!
//! - [`MemoryStore`] — in-process, for tests and local development;
//! - [`RestStore`] — a Redis-over-REST service (Upstash-style HTTP API).
//!
//! # Quick Start
//!
//! ```rust
//! use keypool_store::{KvStore, MemoryStore, Token};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemoryStore::new();
//! let token = Token::new("sk-example").unwrap();
//!
//! let added = store.set_add("API_KEY_SET", &[token.clone()]).await.unwrap();
//! assert_eq!(added, 1);
//!
//! let members = store.set_members("API_KEY_SET").await.unwrap();
//! assert!(members.contains(&token));
//! # }
//! ```

pub mod memory;
pub mod rest;
pub mod store;
pub mod token;

pub use memory::{MemoryStore, MemoryStoreError};
pub use rest::{RestStore, RestStoreError};
pub use store::KvStore;
pub use token::{Token, TokenError};
