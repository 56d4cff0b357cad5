// Error types for the quill application.
// Covers transport failures, GraphQL-level errors, and local validation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuillError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Invalid repository path: {0}")]
    InvalidPath(String),

    #[error("Operation not allowed right now: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No cached entry for this operation")]
    CacheMiss,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, QuillError>;
