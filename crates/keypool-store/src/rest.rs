//! Redis-over-REST [`KvStore`] backend (Upstash-style HTTP API).
//!
//! Each Redis command is POSTed to the service base URL as a JSON array
//! (`["SADD", "pool", "k1", "k2"]`) with a bearer token; the service replies
//! with `{"result": ...}` on success or `{"error": "..."}` on a command
//! failure.

use std::collections::{BTreeMap, BTreeSet};

use reqwest::Client;
use serde_json::Value;

use crate::store::KvStore;
use crate::token::{Token, TokenError};

/// Errors produced by [`RestStore`].
#[derive(Debug)]
pub enum RestStoreError {
    /// An HTTP transport error (connection refused, timeout, TLS, ...).
    Http(reqwest::Error),
    /// The service returned a non-2xx status code.
    Api { status: u16, body: String },
    /// The service returned `{"error": "..."}` for the command.
    Command(String),
    /// Could not decode the `result` payload into the expected shape.
    Decode(String),
}

impl std::fmt::Display for RestStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api { status, body } => write!(f, "store API error ({status}): {body}"),
            Self::Command(msg) => write!(f, "store command error: {msg}"),
            Self::Decode(msg) => write!(f, "store response decode error: {msg}"),
        }
    }
}

impl std::error::Error for RestStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TokenError> for RestStoreError {
    fn from(e: TokenError) -> Self {
        Self::Decode(format!("invalid token in store response: {e}"))
    }
}

/// [`KvStore`] backend speaking the Upstash Redis REST protocol.
pub struct RestStore {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl RestStore {
    /// `base_url` is the service root (e.g. `https://xyz.upstash.io`);
    /// `auth_token` is the REST bearer token.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, auth_token)
    }

    /// Use a pre-built client (custom timeout, proxy, ...).
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Execute one Redis command and return the decoded `result` value.
    async fn command(&self, cmd: Vec<String>) -> Result<Value, RestStoreError> {
        let resp = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.auth_token)
            .json(&cmd)
            .send()
            .await
            .map_err(RestStoreError::Http)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RestStoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = resp.json().await.map_err(RestStoreError::Http)?;
        if let Some(err) = json.get("error").and_then(Value::as_str) {
            return Err(RestStoreError::Command(err.to_string()));
        }
        json.get("result")
            .cloned()
            .ok_or_else(|| RestStoreError::Decode("missing 'result' field".to_string()))
    }

    fn decode_count(result: Value) -> Result<u64, RestStoreError> {
        result
            .as_u64()
            .ok_or_else(|| RestStoreError::Decode(format!("expected integer result, got {result}")))
    }
}

fn with_members(cmd: &[&str], tokens: &[Token]) -> Vec<String> {
    cmd.iter()
        .map(|s| s.to_string())
        .chain(tokens.iter().map(|t| t.as_str().to_string()))
        .collect()
}

impl KvStore for RestStore {
    type Error = RestStoreError;

    async fn set_members(&self, name: &str) -> Result<BTreeSet<Token>, Self::Error> {
        let result = self
            .command(vec!["SMEMBERS".to_string(), name.to_string()])
            .await?;
        let items = result
            .as_array()
            .ok_or_else(|| RestStoreError::Decode("SMEMBERS result is not an array".to_string()))?;

        let mut members = BTreeSet::new();
        for item in items {
            let raw = item.as_str().ok_or_else(|| {
                RestStoreError::Decode("SMEMBERS member is not a string".to_string())
            })?;
            members.insert(Token::new(raw)?);
        }
        Ok(members)
    }

    async fn set_add(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = self.command(with_members(&["SADD", name], tokens)).await?;
        Self::decode_count(result)
    }

    async fn set_remove(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = self.command(with_members(&["SREM", name], tokens)).await?;
        Self::decode_count(result)
    }

    async fn hash_get_all(&self, name: &str) -> Result<BTreeMap<Token, String>, Self::Error> {
        let result = self
            .command(vec!["HGETALL".to_string(), name.to_string()])
            .await?;
        // HGETALL comes back as a flat [field, value, field, value, ...] array.
        let items = result
            .as_array()
            .ok_or_else(|| RestStoreError::Decode("HGETALL result is not an array".to_string()))?;
        if items.len() % 2 != 0 {
            return Err(RestStoreError::Decode(
                "HGETALL result has an odd number of entries".to_string(),
            ));
        }

        let mut map = BTreeMap::new();
        for pair in items.chunks(2) {
            let field = pair[0].as_str().ok_or_else(|| {
                RestStoreError::Decode("HGETALL field is not a string".to_string())
            })?;
            let value = pair[1].as_str().ok_or_else(|| {
                RestStoreError::Decode("HGETALL value is not a string".to_string())
            })?;
            map.insert(Token::new(field)?, value.to_string());
        }
        Ok(map)
    }

    async fn hash_set(&self, name: &str, token: &Token, value: &str) -> Result<(), Self::Error> {
        self.command(vec![
            "HSET".to_string(),
            name.to_string(),
            token.as_str().to_string(),
            value.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn hash_delete(&self, name: &str, tokens: &[Token]) -> Result<u64, Self::Error> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let result = self.command(with_members(&["HDEL", name], tokens)).await?;
        Self::decode_count(result)
    }
}
