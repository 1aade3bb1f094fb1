//! Error types for the GitHub client.

use thiserror::Error;

/// Errors returned by [`RepoHost`](crate::RepoHost) operations.
#[derive(Error, Debug)]
pub enum GithubError {
    /// Missing, expired or rejected token.
    #[error("GitHub rejected the credentials: {0}")]
    Unauthorized(String),

    /// Repository, file or user does not exist (or is not visible).
    #[error("{0}")]
    NotFound(String),

    /// Any other non-2xx response; `message` is GitHub's own message.
    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected GitHub response: {0}")]
    Decode(String),

    /// Rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for GitHub operations.
pub type Result<T> = std::result::Result<T, GithubError>;
