//! Bounded fan-out scheduler: probe a whole token set concurrently.

use std::collections::{BTreeMap, BTreeSet};

use futures::StreamExt;
use keypool_store::Token;
use reqwest::Client;

use crate::config::ProbeConfig;
use crate::probe::probe;
use crate::verdict::Verdict;

/// Emit a progress event every this many completed probes.
const PROGRESS_EVERY: usize = 50;

/// Probe every token in `tokens`, with at most `config.max_in_flight`
/// probes in flight at once, and collect the verdicts.
///
/// Verdicts are collected as probes complete — completion order is
/// unconstrained and carries no meaning. The returned map covers every
/// input token exactly once. Probers share no mutable state; the only
/// coordination is the completion counting done here.
pub async fn probe_all(
    http: &Client,
    config: &ProbeConfig,
    tokens: &BTreeSet<Token>,
) -> BTreeMap<Token, Verdict> {
    let total = tokens.len();
    if total == 0 {
        return BTreeMap::new();
    }

    tracing::info!(total, ceiling = config.max_in_flight, "starting probe fan-out");

    let mut stream = futures::stream::iter(tokens.iter().cloned())
        .map(|token| async move {
            let verdict = probe(http, config, &token).await;
            (token, verdict)
        })
        .buffer_unordered(config.max_in_flight.max(1));

    let mut verdicts = BTreeMap::new();
    let mut completed = 0usize;
    while let Some((token, verdict)) = stream.next().await {
        verdicts.insert(token, verdict);
        completed += 1;
        if completed % PROGRESS_EVERY == 0 || completed == total {
            tracing::info!(completed, total, "probe progress");
        }
    }

    verdicts
}
