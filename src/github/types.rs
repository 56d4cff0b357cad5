// GitHub GraphQL wire types.
// Defines the request/response envelope and the repository/issue payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GraphQL request body: document plus typed variables.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    pub variables: Value,
}

/// GraphQL response envelope. Both halves are optional on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLResponse {
    pub data: Option<Value>,
    pub errors: Option<Vec<GraphQLError>>,
}

/// A single error from the response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<Value>,
    #[serde(default)]
    pub path: Vec<Value>,
}

impl GraphQLError {
    /// Wraps a plain message, for errors produced locally rather than remotely.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }
}

/// GitHub repository with its first page of issues.
///
/// The identity fields are required; the nested selections fall back to
/// empty defaults so a sparse payload still renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub owner: RepoOwner,
    #[serde(default)]
    pub issues: IssueConnection,
}

/// Repository owner (user or organization).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoOwner {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Connection of issues: edges plus pagination info.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueConnection {
    #[serde(default)]
    pub edges: Vec<IssueEdge>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// Edge wrapper around an issue node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueEdge {
    pub node: Issue,
}

/// GitHub issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub number: u64,
    pub title: String,
}

/// Pagination cursor state for a connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// `data` payload of the create-issue mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueData {
    pub create_issue: Option<CreateIssuePayload>,
}

/// Payload object returned by `createIssue`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIssuePayload {
    pub issue: Option<Issue>,
}
