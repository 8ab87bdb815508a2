//! Thin JSON client for the node's `/api/v1` endpoints.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    kind: String,
}

pub struct NodeClient {
    endpoint: String,
    http: reqwest::Client,
}

impl NodeClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.endpoint, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| self.unreachable())?;
        Self::decode(resp).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .with_context(|| self.unreachable())?;
        Self::decode(resp).await
    }

    fn unreachable(&self) -> String {
        format!(
            "could not reach node at {} (is sluice-node running?)",
            self.endpoint
        )
    }

    async fn decode(resp: reqwest::Response) -> anyhow::Result<Value> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("{}", describe_error(status.as_u16(), &text))
    }
}

/// Render a failed response for the terminal.
fn describe_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => format!("request failed (HTTP {status}, {}): {}", err.kind, err.error),
        Err(_) => format!("request failed (HTTP {status})"),
    }
}

/// Print a JSON response, indented.
pub fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
