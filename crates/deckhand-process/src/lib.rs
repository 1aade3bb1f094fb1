//! Local tool adapters for Deckhand.
//!
//! Wraps the `git`, `heroku` and `sh` binaries behind async traits. Every
//! call runs with an explicit working directory and a timeout; nothing in
//! this crate changes the process-wide current directory or environment.
//!
//! # Example
//!
//! ```ignore
//! use deckhand_process::{GitCli, ProcessRunner, SourceControl};
//! use std::time::Duration;
//!
//! let git = GitCli::new(ProcessRunner::new(Duration::from_secs(300)));
//! git.pull(std::path::Path::new("workspace/my-repo")).await?;
//! ```

pub mod error;
pub mod git;
pub mod heroku;
pub mod runner;
pub mod shell;

pub use error::{ProcessError, Result};
pub use git::{repo_dir_name, GitCli, GitIdentity, SourceControl};
pub use heroku::{DeployPlatform, HerokuCli, HEROKU_API_KEY_ENV, LOG_LINES};
pub use runner::{ProcessRunner, ToolOutput};
pub use shell::{CommandShell, ShellRunner};
