//! Configuration errors.

use thiserror::Error;

/// Errors raised while loading startup configuration.
///
/// These are fatal: the binary refuses to start when any of them occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("{0} is not set. Add it to the environment or to the .env file.")]
    Missing(&'static str),

    /// A variable is present but its value cannot be used.
    #[error("{var} is invalid: {reason}")]
    Invalid {
        /// Name of the offending variable.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Filesystem error while preparing directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
