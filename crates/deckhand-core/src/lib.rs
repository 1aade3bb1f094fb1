//! Deckhand Core - shared configuration for all Deckhand crates.
//!
//! - **config**: environment-driven startup configuration and directory layout
//! - **error**: fatal configuration errors
//! - **text**: helpers for fitting text into a single chat message

pub mod config;
pub mod error;
pub mod text;

pub use config::{
    deckhand_home, env_file, Config, GithubSettings, OpenAiSettings, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_TOOL_TIMEOUT_SECS,
};
pub use error::{ConfigError, Result};
pub use text::{telegram_len, truncate_for_chat, TELEGRAM_MESSAGE_LIMIT};
