//! Minimal Redis-over-HTTP client for the external fast store.
//!
//! Commands are path-encoded (`GET {base}/incr/{key}`) with bearer auth and
//! answered as `{ "result": ... }` JSON. Only the handful of commands the
//! limiter and marker need are wrapped.

use serde::Deserialize;

/// Errors from the fast-store REST layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS).
    #[error("Fast store request failed: {0}")]
    Transport(String),

    /// The store returned a non-2xx status code.
    #[error("Fast store error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The store answered with a shape we do not recognize.
    #[error("Unexpected fast store payload: {0}")]
    UnexpectedPayload(String),
}

/// `{ "result": ... }` envelope returned for every command.
#[derive(Debug, Deserialize)]
struct CommandResponse {
    result: serde_json::Value,
}

/// HTTP client for one fast-store instance.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestStore {
    /// Create a client for the store at `base_url` with a bearer `token`.
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    /// Increment `key`, returning the post-increment value.
    pub async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let result = self.command(&format!("incr/{key}")).await?;
        result
            .as_i64()
            .ok_or_else(|| StoreError::UnexpectedPayload(format!("INCR returned {result}")))
    }

    /// Set a time-to-live on `key`.
    pub async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), StoreError> {
        self.command(&format!("expire/{key}/{ttl_secs}")).await?;
        Ok(())
    }

    /// Read `key` as an integer counter; `None` when the key is absent.
    pub async fn get_i64(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let result = self.command(&format!("get/{key}")).await?;
        match result {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::String(s) => s.parse::<i64>().map(Some).map_err(|_| {
                StoreError::UnexpectedPayload(format!("GET returned non-numeric '{s}'"))
            }),
            serde_json::Value::Number(n) => Ok(n.as_i64()),
            other => Err(StoreError::UnexpectedPayload(format!("GET returned {other}"))),
        }
    }

    /// `SET key value EX ttl NX`; `true` when the key was newly set.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let result = self
            .command(&format!("set/{key}/{value}/ex/{ttl_secs}/nx"))
            .await?;
        Ok(!result.is_null())
    }

    /// Whether `key` exists.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.command(&format!("exists/{key}")).await?;
        match result.as_i64() {
            Some(n) => Ok(n > 0),
            None => Err(StoreError::UnexpectedPayload(format!(
                "EXISTS returned {result}"
            ))),
        }
    }

    // ---- private helpers ----

    async fn command(&self, path: &str) -> Result<serde_json::Value, StoreError> {
        let response = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<CommandResponse>()
            .await
            .map_err(|e| StoreError::UnexpectedPayload(e.to_string()))?;
        Ok(parsed.result)
    }
}
