//! Error types for the Telegram bot.

use deckhand_core::ConfigError;
use deckhand_github::GithubError;
use deckhand_openai::OpenAiError;
use deckhand_process::ProcessError;
use thiserror::Error;

/// Failure of a single command, rendered into exactly one chat reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Missing or rejected credential.
    #[error("🔒 {0}")]
    Unauthorized(String),

    /// Missing or malformed arguments, or a missing session setting.
    /// The payload is shown to the user as-is.
    #[error("{0}")]
    BadRequest(String),

    /// The hosting API does not know the resource.
    #[error("❌ Not found: {0}")]
    NotFound(String),

    /// A local tool failed to start, exited non-zero or timed out.
    #[error("❌ {tool} failed: {output}")]
    ToolFailure { tool: String, output: String },

    /// An HTTP API answered with an error or could not be reached.
    #[error("❌ {service} error: {message}")]
    Upstream { service: String, message: String },
}

impl CommandError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Text sent to the chat for this error.
    pub fn to_reply_text(&self) -> String {
        self.to_string()
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::ToolFailure { .. } => "tool_failure",
            Self::Upstream { .. } => "upstream",
        }
    }
}

/// Result type for command handlers.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

impl From<ProcessError> for CommandError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::InvalidArgument(reason) => CommandError::BadRequest(reason),
            ProcessError::CommandFailed { tool, output, status } => CommandError::ToolFailure {
                tool,
                output: if output.is_empty() { status } else { output },
            },
            ProcessError::Spawn { tool, source } => CommandError::ToolFailure {
                tool,
                output: source.to_string(),
            },
            ProcessError::TimedOut { tool, secs } => CommandError::ToolFailure {
                tool,
                output: format!("timed out after {}s", secs),
            },
        }
    }
}

impl From<GithubError> for CommandError {
    fn from(e: GithubError) -> Self {
        match e {
            GithubError::Unauthorized(message) => {
                CommandError::Unauthorized(format!("GitHub rejected the token: {}", message))
            }
            GithubError::NotFound(what) => CommandError::NotFound(what),
            GithubError::InvalidInput(reason) => CommandError::BadRequest(reason),
            GithubError::Api { message, .. } => CommandError::Upstream {
                service: "GitHub".to_string(),
                message,
            },
            other => CommandError::Upstream {
                service: "GitHub".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<OpenAiError> for CommandError {
    fn from(e: OpenAiError) -> Self {
        match e {
            OpenAiError::Unauthorized(message) => CommandError::Unauthorized(message),
            other => CommandError::Upstream {
                service: "OpenAI".to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Errors that stop the bot from starting or running.
#[derive(Debug, Error)]
pub enum BotError {
    /// Missing or malformed configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An HTTP client could not be constructed.
    #[error("Failed to build {service} client: {message}")]
    Client { service: &'static str, message: String },

    /// The Telegram API rejected a startup request.
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Result type for bot startup.
pub type Result<T> = std::result::Result<T, BotError>;
