//! Single-token validity prober.
//!
//! One probe issues the fixed minimal generation request with the token as
//! the `key` query parameter and classifies the response status:
//!
//! - `200` / `429` → [`Verdict::Active`] (a rate-limited response still
//!   proves the service recognizes the token);
//! - `403` / `503` → [`Verdict::Invalid`];
//! - anything else (transport error, timeout, unexpected status) is
//!   inconclusive and triggers a retry after a fixed delay.
//!
//! When the attempt budget is exhausted without a conclusive response the
//! token is finalized as Invalid — fail-closed, an unverifiable token is
//! treated as no longer valid. `probe` never returns an error.

use keypool_store::Token;
use reqwest::Client;

use crate::config::ProbeConfig;
use crate::verdict::Verdict;

/// Probe one token against the validation endpoint.
///
/// Token values are never logged; diagnostics carry only status codes and
/// attempt counters.
pub async fn probe(http: &Client, config: &ProbeConfig, token: &Token) -> Verdict {
    let url = format!("{}?key={}", config.endpoint, token);
    let payload = serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]});

    let attempts = config.max_attempts.max(1);
    for attempt in 1..=attempts {
        match http.post(&url).json(&payload).send().await {
            Ok(resp) => match resp.status().as_u16() {
                200 | 429 => return Verdict::Active,
                403 | 503 => return Verdict::Invalid,
                status => {
                    tracing::debug!(attempt, status, "inconclusive probe status, will retry");
                }
            },
            Err(e) => {
                tracing::debug!(attempt, error = %e, "probe transport error, will retry");
            }
        }
        if attempt < attempts {
            tokio::time::sleep(config.retry_delay).await;
        }
    }

    tracing::debug!(attempts, "probe attempts exhausted, failing closed");
    Verdict::Invalid
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;

    use super::*;

    fn tok(s: &str) -> Token {
        Token::new(s).unwrap()
    }

    /// Fast-retry config pointed at a mock server.
    fn test_config(server: &MockServer) -> ProbeConfig {
        ProbeConfig::default()
            .with_endpoint(format!("{}/v1/models/test:generateContent", server.base_url()))
            .with_retry_delay(Duration::from_millis(10))
            .with_timeout(Duration::from_millis(500))
    }

    fn client(config: &ProbeConfig) -> Client {
        config.http_client().unwrap()
    }

    #[tokio::test]
    async fn accepted_response_is_active() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/models/test:generateContent")
                .query_param("key", "sk-good")
                .json_body(serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]}));
            then.status(200).body(r#"{"candidates":[]}"#);
        });

        let config = test_config(&server);
        let verdict = probe(&client(&config), &config, &tok("sk-good")).await;
        assert_eq!(verdict, Verdict::Active);
        mock.assert();
    }

    /// A 429 proves the key is recognized: Active, and no further attempts.
    #[tokio::test]
    async fn rate_limited_response_is_active_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).query_param("key", "sk-busy");
            then.status(429).body(r#"{"error":{"message":"quota"}}"#);
        });

        let config = test_config(&server);
        let verdict = probe(&client(&config), &config, &tok("sk-busy")).await;
        assert_eq!(verdict, Verdict::Active);
        assert_eq!(mock.hits(), 1, "conclusive 429 must not be retried");
    }

    #[tokio::test]
    async fn rejected_response_is_invalid_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).query_param("key", "sk-revoked");
            then.status(403).body(r#"{"error":{"message":"forbidden"}}"#);
        });

        let config = test_config(&server);
        let verdict = probe(&client(&config), &config, &tok("sk-revoked")).await;
        assert_eq!(verdict, Verdict::Invalid);
        assert_eq!(mock.hits(), 1, "conclusive 403 must not be retried");
    }

    #[tokio::test]
    async fn service_unavailable_is_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(503);
        });

        let config = test_config(&server);
        let verdict = probe(&client(&config), &config, &tok("sk-x")).await;
        assert_eq!(verdict, Verdict::Invalid);
    }

    /// Inconclusive statuses exhaust the attempt budget and fail closed.
    #[tokio::test]
    async fn persistent_unexpected_status_exhausts_attempts_and_fails_closed() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(500).body("boom");
        });

        let config = test_config(&server);
        let verdict = probe(&client(&config), &config, &tok("sk-flaky")).await;
        assert_eq!(verdict, Verdict::Invalid);
        assert_eq!(mock.hits(), 3, "must attempt exactly max_attempts times");
    }

    /// Fail-closed probing: every attempt times out ⇒ Invalid, not an error.
    #[tokio::test]
    async fn all_timeouts_resolve_invalid() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            // Longer than the client timeout — every attempt times out.
            then.status(200).delay(Duration::from_millis(300));
        });

        let config = test_config(&server)
            .with_timeout(Duration::from_millis(50))
            .with_retry_delay(Duration::from_millis(5));
        let verdict = probe(&client(&config), &config, &tok("sk-slow")).await;
        assert_eq!(verdict, Verdict::Invalid);
        assert_eq!(mock.hits(), 3);
    }

    /// Connection refused on every attempt also fails closed.
    #[tokio::test]
    async fn connection_refused_resolves_invalid() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ProbeConfig::default()
            .with_endpoint(format!("http://127.0.0.1:{port}/check"))
            .with_retry_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(200));
        let verdict = probe(&client(&config), &config, &tok("sk-unreachable")).await;
        assert_eq!(verdict, Verdict::Invalid);
    }

    /// An inconclusive 500 followed by a 200 on the retry resolves Active.
    ///
    /// Uses a raw TCP server with a counter:
    /// - attempt 1 → 500 with `Connection: close` (forces a new TCP conn)
    /// - attempt 2 → 200
    #[tokio::test]
    async fn inconclusive_then_accepted_resolves_active_on_retry() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let attempt_count = Arc::new(AtomicU32::new(0));
        let counter = attempt_count.clone();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                let mut buf = vec![0u8; 4096];
                stream.read(&mut buf).await.ok();

                if n == 1 {
                    let r = b"HTTP/1.1 500 Internal Server Error\r\n\
                              Connection: close\r\n\
                              content-length: 5\r\n\r\nerror";
                    stream.write_all(r).await.ok();
                } else {
                    let r = b"HTTP/1.1 200 OK\r\n\
                              content-length: 2\r\n\r\nok";
                    stream.write_all(r).await.ok();
                    break;
                }
            }
        });

        let config = ProbeConfig::default()
            .with_endpoint(format!("http://127.0.0.1:{port}/check"))
            .with_retry_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(2));
        let verdict = probe(&client(&config), &config, &tok("sk-retry")).await;

        assert_eq!(verdict, Verdict::Active);
        assert_eq!(
            attempt_count.load(Ordering::SeqCst),
            2,
            "must make exactly 2 attempts"
        );
    }

    /// A zero attempt budget is clamped to one attempt rather than skipping
    /// the probe entirely.
    #[tokio::test]
    async fn zero_attempts_clamped_to_one() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200);
        });

        let config = test_config(&server).with_max_attempts(0);
        let verdict = probe(&client(&config), &config, &tok("sk-min")).await;
        assert_eq!(verdict, Verdict::Active);
        assert_eq!(mock.hits(), 1);
    }
}
