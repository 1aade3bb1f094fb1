//! Error types for the OpenAI client.

use thiserror::Error;

/// Errors returned by [`AiProvider`](crate::AiProvider) operations.
#[derive(Error, Debug)]
pub enum OpenAiError {
    /// The API rejected the key (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),

    /// Any other non-2xx response. `message` is the API's `error.message`.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Transport failure, including timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx response without the expected content.
    #[error("unexpected OpenAI response: {0}")]
    Decode(String),
}

/// Result type alias for OpenAI operations.
pub type Result<T> = std::result::Result<T, OpenAiError>;
