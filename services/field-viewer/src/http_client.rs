//! `QueryClient` over HTTP: one POST per operation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use field_common::{FieldError, FieldResult, QueryClient, QueryResponse};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    operation: &'a str,
    payload: Value,
}

/// Posts `{"operation", "payload"}` to the backend endpoint and decodes the
/// response envelope.
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    client: Client,
    endpoint: String,
}

impl HttpQueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QueryClient for HttpQueryClient {
    #[instrument(skip(self, payload), fields(endpoint = %self.endpoint))]
    async fn query(&self, operation: &str, payload: Value) -> FieldResult<QueryResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&QueryRequest { operation, payload })
            .send()
            .await
            .map_err(|e| FieldError::Transport(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FieldError::Transport(format!(
                "{} returned HTTP {}",
                operation, status
            )));
        }

        let envelope = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| FieldError::Decode(format!("invalid {} response: {}", operation, e)))?;

        debug!(operation = operation, ok = matches!(envelope, QueryResponse::Ok { .. }), "Query answered");
        Ok(envelope)
    }
}
