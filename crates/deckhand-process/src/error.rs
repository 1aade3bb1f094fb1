//! Error types for local tool invocations.

use thiserror::Error;

/// Errors that can occur while running an external tool.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The tool could not be started (missing binary, bad working directory).
    #[error("failed to start {tool}: {source}")]
    Spawn {
        /// Tool name as shown to the user.
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("{tool} failed ({status}): {output}")]
    CommandFailed {
        /// Tool name as shown to the user.
        tool: String,
        /// Exit status description, e.g. `exit code 128`.
        status: String,
        /// Raw stderr/stdout of the tool.
        output: String,
    },

    /// The tool did not finish within the configured timeout.
    #[error("{tool} timed out after {secs}s")]
    TimedOut {
        /// Tool name as shown to the user.
        tool: String,
        /// Timeout that was exceeded.
        secs: u64,
    },

    /// An argument was rejected before anything was spawned.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ProcessError {
    /// Name of the tool involved, if any.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::Spawn { tool, .. } | Self::CommandFailed { tool, .. } | Self::TimedOut { tool, .. } => {
                Some(tool)
            }
            Self::InvalidArgument(_) => None,
        }
    }
}

/// Result type alias for tool invocations.
pub type Result<T> = std::result::Result<T, ProcessError>;
