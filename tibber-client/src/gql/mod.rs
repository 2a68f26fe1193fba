mod homes_query;

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::domain::ProviderResponse;

pub use homes_query::{CONSUMPTION_LOOKBACK, HOMES_QUERY};

pub const DEFAULT_ENDPOINT: &str = "https://api.tibber.com/v1-beta/gql";

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("graphql errors: {0}")]
    Graphql(String),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response carried no data")]
    MissingData,
}

/// Runs a query document against the provider on behalf of `credential`.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, credential: &str) -> Result<ProviderResponse, ClientError>;
}

#[derive(Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<ProviderResponse>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphqlErrorMessage {
    #[serde(default)]
    message: String,
}

/// GraphQL-over-HTTP client for the Tibber API.
#[derive(Clone)]
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

/// A bare token is sent as a bearer credential; a value that already names
/// its scheme (`Bearer abc`) is passed through untouched.
fn authorization_value(credential: &str) -> String {
    let credential = credential.trim();
    if credential.contains(' ') {
        credential.to_string()
    } else {
        format!("Bearer {credential}")
    }
}

#[async_trait::async_trait]
impl QueryExecutor for GraphqlClient {
    async fn execute(&self, query: &str, credential: &str) -> Result<ProviderResponse, ClientError> {
        tracing::debug!(endpoint = %self.endpoint, query_bytes = query.len(), "sending graphql request");

        let resp = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, authorization_value(credential))
            .json(&GraphqlRequest { query })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(status = status.as_u16(), body_bytes = body.len(), "graphql response received");

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphqlEnvelope = serde_json::from_str(&body)?;
        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::Graphql(messages.join("; ")));
        }

        envelope.data.ok_or(ClientError::MissingData)
    }
}
