//! # keypool-reconcile
//!
//! Reconciles credential pools held in a key-value store against the
//! validation endpoint that decides whether a token is still honored.
//!
//! ## Pieces
//!
//! - [`probe`] — one token, one verdict: bounded attempts with a fixed
//!   inter-attempt delay; exhaustion fails closed to Invalid.
//! - [`probe_all`] — bounded concurrent fan-out over a token set, verdicts
//!   collected in completion order.
//! - [`reconcile`] — pure set algebra turning a membership snapshot, staged
//!   candidates, and verdicts into the minimal `{to_add, to_remove,
//!   unchanged}` partition.
//! - [`sweep`] — the expiry sweeper over the token→expiry hash, independent
//!   of probing.
//! - [`run_pass`] — the orchestrator: snapshot → dedup → fan-out →
//!   classify. Reads everything before the caller writes anything, so an
//!   aborted pass leaves the store untouched.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use keypool_reconcile::{run_pass, ProbeConfig};
//! use keypool_store::MemoryStore;
//! use std::collections::BTreeSet;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let config = ProbeConfig::from_env();
//!     let http = config.http_client().unwrap();
//!
//!     let report = run_pass(&store, "API_KEY_SET", &BTreeSet::new(), &http, &config)
//!         .await
//!         .unwrap();
//!     println!("{} to add, {} to remove", report.plan.to_add.len(), report.plan.to_remove.len());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod fanout;
pub mod plan;
pub mod probe;
pub mod sweep;
pub mod verdict;

pub use config::ProbeConfig;
pub use engine::{run_pass, PassReport};
pub use fanout::probe_all;
pub use plan::{reconcile, ReconciliationPlan};
pub use probe::probe;
pub use sweep::{now_epoch_secs, sweep};
pub use verdict::Verdict;
