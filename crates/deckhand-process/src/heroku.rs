//! Heroku deployment through the `heroku` CLI.
//!
//! The API key is handed to each child process as `HEROKU_API_KEY` and is
//! never written to the bot's own environment, so concurrent users with
//! different keys do not interfere.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::runner::{locate, ProcessRunner};
use crate::{ProcessError, Result};

/// Environment variable the Heroku CLI reads its credentials from.
pub const HEROKU_API_KEY_ENV: &str = "HEROKU_API_KEY";

/// Number of log lines fetched by [`DeployPlatform::logs`].
pub const LOG_LINES: u32 = 200;

/// Application hosting operations.
#[async_trait]
pub trait DeployPlatform: Send + Sync {
    /// Create a new app named `app`.
    async fn create_app(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String>;

    /// Point the `heroku` git remote of the repository in `cwd` at `app`.
    async fn set_remote(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String>;

    /// Push the current commit of `cwd` to the `heroku` remote.
    async fn push(&self, api_key: &str, cwd: &Path) -> Result<String>;

    /// Dyno status of `app`.
    async fn status(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String>;

    /// Recent log lines of `app`.
    async fn logs(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String>;
}

/// [`DeployPlatform`] backed by the `heroku` and `git` binaries.
#[derive(Debug, Clone)]
pub struct HerokuCli {
    heroku: PathBuf,
    git: PathBuf,
    runner: ProcessRunner,
}

impl HerokuCli {
    pub fn new(runner: ProcessRunner) -> Self {
        Self::with_programs(runner, locate("heroku"), locate("git"))
    }

    /// Use specific `heroku` and `git` binaries.
    pub fn with_programs(
        runner: ProcessRunner,
        heroku: impl Into<PathBuf>,
        git: impl Into<PathBuf>,
    ) -> Self {
        Self {
            heroku: heroku.into(),
            git: git.into(),
            runner,
        }
    }

    /// Check if the heroku CLI is available in PATH.
    pub fn is_available() -> bool {
        which::which("heroku").is_ok()
    }

    async fn heroku(&self, api_key: &str, args: &[&str], cwd: &Path) -> Result<String> {
        check_key(api_key)?;
        let output = self
            .runner
            .run_checked(&self.heroku, args, cwd, &[(HEROKU_API_KEY_ENV, api_key)])
            .await?;
        Ok(output.combined())
    }
}

fn check_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(ProcessError::InvalidArgument("empty Heroku API key".into()));
    }
    Ok(())
}

fn check_app(app: &str) -> Result<()> {
    if app.is_empty() || app.starts_with('-') {
        return Err(ProcessError::InvalidArgument(format!("not an app name: {:?}", app)));
    }
    Ok(())
}

#[async_trait]
impl DeployPlatform for HerokuCli {
    async fn create_app(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String> {
        check_app(app)?;
        let out = self.heroku(api_key, &["create", app], cwd).await?;
        info!(app = %app, "heroku app created");
        Ok(out)
    }

    async fn set_remote(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String> {
        check_app(app)?;
        self.heroku(api_key, &["git:remote", "-a", app], cwd).await
    }

    async fn push(&self, api_key: &str, cwd: &Path) -> Result<String> {
        check_key(api_key)?;
        let output = self
            .runner
            .run_checked(
                &self.git,
                &["push", "heroku", "HEAD:master"],
                cwd,
                &[(HEROKU_API_KEY_ENV, api_key), ("GIT_TERMINAL_PROMPT", "0")],
            )
            .await?;
        info!(cwd = %cwd.display(), "pushed to heroku");
        Ok(output.combined())
    }

    async fn status(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String> {
        check_app(app)?;
        self.heroku(api_key, &["ps", "-a", app], cwd).await
    }

    async fn logs(&self, api_key: &str, app: &str, cwd: &Path) -> Result<String> {
        check_app(app)?;
        let lines = LOG_LINES.to_string();
        self.heroku(api_key, &["logs", "-n", &lines, "-a", app], cwd).await
    }
}
