//! Pass orchestrator: snapshot the store, probe, and compute the plan.

use std::collections::BTreeSet;

use keypool_store::{KvStore, Token};
use reqwest::Client;

use crate::config::ProbeConfig;
use crate::fanout::probe_all;
use crate::plan::{reconcile, ReconciliationPlan};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Membership snapshot the pass was computed against.
    pub members: BTreeSet<Token>,
    /// The computed write plan.
    pub plan: ReconciliationPlan,
    /// Number of unique tokens probed.
    pub probed: usize,
    /// Tokens with an Active verdict.
    pub active: usize,
    /// Tokens with an Invalid verdict (including fail-closed resolutions).
    pub invalid: usize,
}

impl PassReport {
    /// Membership expected after the plan is applied — the backup value.
    pub fn expected_members(&self) -> BTreeSet<Token> {
        self.plan.expected_members(&self.members)
    }
}

/// Run one reconciliation pass over the named set.
///
/// 1. snapshot the store's current membership;
/// 2. union it with the staged candidates (pure set union — duplicates
///    collapse);
/// 3. probe every candidate through the bounded fan-out;
/// 4. classify verdicts against the snapshot.
///
/// The pass performs no store mutation: verdicts are computed against the
/// snapshot taken before probing, and the caller applies the plan's write
/// sets afterwards. If the store is unreachable the error propagates here,
/// before anything was written, so a failed pass leaves external state
/// exactly as it was.
pub async fn run_pass<S: KvStore>(
    store: &S,
    set_name: &str,
    staged: &BTreeSet<Token>,
    http: &Client,
    config: &ProbeConfig,
) -> Result<PassReport, S::Error> {
    let members = store.set_members(set_name).await?;

    let candidates: BTreeSet<Token> = members.union(staged).cloned().collect();
    tracing::info!(
        set = %set_name,
        members = members.len(),
        staged = staged.len(),
        candidates = candidates.len(),
        "reconciliation pass starting"
    );

    let verdicts = probe_all(http, config, &candidates).await;
    let active = verdicts.values().filter(|v| v.is_active()).count();
    let probed = verdicts.len();

    let plan = reconcile(&members, staged, &verdicts);
    tracing::info!(
        probed,
        active,
        invalid = probed - active,
        to_add = plan.to_add.len(),
        to_remove = plan.to_remove.len(),
        unchanged = plan.unchanged.len(),
        "reconciliation pass complete"
    );

    Ok(PassReport {
        members,
        plan,
        probed,
        active,
        invalid: probed - active,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use keypool_store::MemoryStore;

    use super::*;

    fn tok(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<Token> {
        items.iter().map(|s| tok(s)).collect()
    }

    fn test_config(server: &MockServer) -> ProbeConfig {
        ProbeConfig::default()
            .with_endpoint(format!("{}/check", server.base_url()))
            .with_retry_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(500))
            .with_max_in_flight(8)
    }

    /// End-to-end Scenario A: k1 active member, k2 invalid member, k3 active
    /// staged candidate.
    #[tokio::test]
    async fn pass_computes_scenario_a_plan() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).query_param("key", "k2");
            then.status(403);
        });
        server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let store = MemoryStore::new();
        store.seed_set("pool", &tok("k1"));
        store.seed_set("pool", &tok("k2"));

        let config = test_config(&server);
        let http = config.http_client().unwrap();
        let staged = set(&["k3"]);

        let report = run_pass(&store, "pool", &staged, &http, &config)
            .await
            .unwrap();

        assert_eq!(report.probed, 3);
        assert_eq!(report.active, 2);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.plan.to_add, set(&["k3"]));
        assert_eq!(report.plan.to_remove, set(&["k2"]));
        assert_eq!(report.plan.unchanged, set(&["k1"]));
        assert_eq!(report.expected_members(), set(&["k1", "k3"]));

        // The pass itself never mutates the store.
        assert_eq!(store.set_len("pool"), 2);
    }

    /// Candidates overlapping the membership are probed once, not twice.
    #[tokio::test]
    async fn overlapping_staged_tokens_are_probed_once() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).query_param("key", "k1");
            then.status(200);
        });

        let store = MemoryStore::new();
        store.seed_set("pool", &tok("k1"));

        let config = test_config(&server);
        let http = config.http_client().unwrap();
        let staged = set(&["k1"]);

        let report = run_pass(&store, "pool", &staged, &http, &config)
            .await
            .unwrap();

        assert_eq!(report.probed, 1);
        assert_eq!(mock.hits(), 1);
        assert!(report.plan.is_noop());
    }

    #[tokio::test]
    async fn empty_store_and_staging_probes_nothing() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });

        let store = MemoryStore::new();
        let config = test_config(&server);
        let http = config.http_client().unwrap();

        let report = run_pass(&store, "pool", &BTreeSet::new(), &http, &config)
            .await
            .unwrap();

        assert_eq!(report.probed, 0);
        assert!(report.plan.is_noop());
        assert_eq!(mock.hits(), 0);
    }

    /// An unreachable validation endpoint fails every probe closed: every
    /// member ends up in to_remove, every staged candidate in unchanged.
    #[tokio::test]
    async fn unreachable_endpoint_fails_all_probes_closed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = MemoryStore::new();
        store.seed_set("pool", &tok("k1"));

        let config = ProbeConfig::default()
            .with_endpoint(format!("http://127.0.0.1:{port}/check"))
            .with_max_attempts(1)
            .with_retry_delay(Duration::from_millis(1))
            .with_timeout(Duration::from_millis(200));
        let http = config.http_client().unwrap();
        let staged = set(&["k2"]);

        let report = run_pass(&store, "pool", &staged, &http, &config)
            .await
            .unwrap();

        assert_eq!(report.invalid, 2);
        assert_eq!(report.plan.to_remove, set(&["k1"]));
        // k2 is invalid but not a member — removal would be a no-op.
        assert_eq!(report.plan.unchanged, set(&["k2"]));
    }
}
