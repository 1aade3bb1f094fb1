//! OpenAI access for Deckhand: chat completions and image generation.

pub mod client;
pub mod error;

pub use client::{AiProvider, OpenAiClient};
pub use error::{OpenAiError, Result};
