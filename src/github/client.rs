// GitHub GraphQL HTTP transport.
// Sends operations to the single /graphql endpoint and parses the envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};

use crate::error::{QuillError, Result};

use super::types::{GraphQLRequest, GraphQLResponse};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
/// Preview media type for the issues API surface.
const GITHUB_ACCEPT: &str = "application/vnd.github.starfox-preview+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes a GraphQL request, returning the parsed response envelope.
///
/// Implementations own timeout and transport policy; callers see any
/// non-success outcome as an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse>;
}

/// GitHub GraphQL client with bearer authentication.
pub struct GitHubClient {
    client: Client,
    endpoint: String,
}

impl GitHubClient {
    /// Create a new client with the given token and endpoint.
    pub fn new(token: &str, endpoint: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| QuillError::Other(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static("quill-tui"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(QuillError::Api)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Create a client from the GITHUB_TOKEN environment variable.
    /// GITHUB_GRAPHQL_URL overrides the endpoint when set.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| QuillError::MissingToken)?;
        let endpoint =
            std::env::var("GITHUB_GRAPHQL_URL").unwrap_or_else(|_| GITHUB_GRAPHQL_URL.to_string());
        Self::new(&token, &endpoint)
    }
}

#[async_trait]
impl Transport for GitHubClient {
    async fn execute(&self, request: GraphQLRequest) -> Result<GraphQLResponse> {
        tracing::debug!(endpoint = %self.endpoint, "Executing GraphQL request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(QuillError::Api)?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await.map_err(QuillError::Api)?),
            StatusCode::UNAUTHORIZED => Err(QuillError::Unauthorized),
            status => Err(QuillError::Other(format!(
                "HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            ))),
        }
    }
}
