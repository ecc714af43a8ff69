//! Probe configuration: endpoint, retry budget, timeouts, fan-out ceiling.

use std::time::Duration;

use reqwest::Client;

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_IN_FLIGHT: usize = 200;

const ENV_ENDPOINT: &str = "KEYPOOL_PROBE_ENDPOINT";
const ENV_MAX_ATTEMPTS: &str = "KEYPOOL_PROBE_ATTEMPTS";
const ENV_RETRY_DELAY_SECS: &str = "KEYPOOL_PROBE_RETRY_DELAY_SECS";
const ENV_TIMEOUT_SECS: &str = "KEYPOOL_PROBE_TIMEOUT_SECS";
const ENV_MAX_IN_FLIGHT: &str = "KEYPOOL_PROBE_MAX_IN_FLIGHT";

/// Fixed configuration for the probing subsystem.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Validation endpoint URL; the token is appended as a `key` query
    /// parameter. Env: `KEYPOOL_PROBE_ENDPOINT`.
    pub endpoint: String,
    /// Total probe attempts per token before the fail-closed Invalid verdict.
    /// Env: `KEYPOOL_PROBE_ATTEMPTS`. Default: `3`.
    pub max_attempts: u32,
    /// Fixed delay between attempts. Env: `KEYPOOL_PROBE_RETRY_DELAY_SECS`.
    /// Default: `2s`.
    pub retry_delay: Duration,
    /// Per-attempt HTTP timeout. Env: `KEYPOOL_PROBE_TIMEOUT_SECS`.
    /// Default: `20s`.
    pub timeout: Duration,
    /// Concurrency ceiling for the fan-out scheduler.
    /// Env: `KEYPOOL_PROBE_MAX_IN_FLIGHT`. Default: `200`.
    pub max_in_flight: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl ProbeConfig {
    /// Load from the environment; unset or unparsable values fall back to the
    /// defaults with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            if !endpoint.is_empty() {
                config.endpoint = endpoint;
            }
        }
        if let Some(attempts) = parse_env_u64(ENV_MAX_ATTEMPTS) {
            config.max_attempts = attempts.min(u32::MAX as u64) as u32;
        }
        if let Some(secs) = parse_env_u64(ENV_RETRY_DELAY_SECS) {
            config.retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env_u64(ENV_TIMEOUT_SECS) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_env_u64(ENV_MAX_IN_FLIGHT) {
            config.max_in_flight = n.max(1) as usize;
        }

        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, ceiling: usize) -> Self {
        self.max_in_flight = ceiling;
        self
    }

    /// Build the HTTP client used for probing, with the per-attempt timeout
    /// applied so a hung request cannot exceed the retry budget's bound.
    pub fn http_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder().timeout(self.timeout).build()
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{name}={raw:?} is not a valid integer, using default");
            None
        }
    }
}
