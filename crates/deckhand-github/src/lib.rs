//! GitHub access for Deckhand.
//!
//! [`RepoHost`] is the seam the bot talks to; [`GithubClient`] implements it
//! on top of the GitHub REST API with `reqwest`.

pub mod client;
pub mod error;
pub mod host;

pub use client::GithubClient;
pub use error::{GithubError, Result};
pub use host::{RemoteFile, RepoHost};
