//! Local `git` operations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::runner::{locate, ProcessRunner};
use crate::{ProcessError, Result};

/// Local source-control operations, each bound to an explicit directory.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Clone `url` into `dest`. The parent of `dest` must exist.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<String>;

    /// Stage everything in `repo` and commit it.
    ///
    /// Returns `Ok(None)` when there was nothing to commit.
    async fn commit_all(&self, repo: &Path, message: &str) -> Result<Option<String>>;

    /// Push the current branch of `repo` to its upstream.
    async fn push(&self, repo: &Path) -> Result<String>;

    /// Pull into the current branch of `repo`.
    async fn pull(&self, repo: &Path) -> Result<String>;
}

/// Author identity passed to `git commit` via `-c user.*`.
#[derive(Debug, Clone)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

/// [`SourceControl`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    git: PathBuf,
    runner: ProcessRunner,
    identity: Option<GitIdentity>,
}

impl GitCli {
    /// Create a git adapter using `git` from PATH.
    pub fn new(runner: ProcessRunner) -> Self {
        Self::with_program(runner, locate("git"))
    }

    /// Create a git adapter using a specific binary.
    pub fn with_program(runner: ProcessRunner, git: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            runner,
            identity: None,
        }
    }

    /// Commit with this identity instead of the user's git config.
    pub fn with_identity(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.identity = Some(GitIdentity {
            name: name.into(),
            email: email.into(),
        });
        self
    }

    /// Check if git is available in PATH.
    pub fn is_available() -> bool {
        which::which("git").is_ok()
    }

    /// Path of the git binary in use.
    pub fn program(&self) -> &Path {
        &self.git
    }

    async fn git(&self, args: &[&str], cwd: &Path) -> Result<String> {
        let output = self
            .runner
            .run_checked(&self.git, args, cwd, &[("GIT_TERMINAL_PROMPT", "0")])
            .await?;
        Ok(output.combined())
    }
}

#[async_trait]
impl SourceControl for GitCli {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<String> {
        let url = url.trim();
        if url.is_empty() || url.starts_with('-') {
            return Err(ProcessError::InvalidArgument(format!(
                "not a repository url: {:?}",
                url
            )));
        }
        let parent = dest
            .parent()
            .ok_or_else(|| ProcessError::InvalidArgument("clone target has no parent".into()))?;
        let dest_str = dest.to_string_lossy();

        debug!(url = %url, dest = %dest.display(), "cloning repository");
        let out = self.git(&["clone", "--", url, &dest_str], parent).await?;
        info!(url = %url, dest = %dest.display(), "repository cloned");
        Ok(out)
    }

    async fn commit_all(&self, repo: &Path, message: &str) -> Result<Option<String>> {
        self.git(&["add", "-A"], repo).await?;

        let mut args: Vec<String> = Vec::new();
        if let Some(identity) = &self.identity {
            args.push("-c".into());
            args.push(format!("user.name={}", identity.name));
            args.push("-c".into());
            args.push(format!("user.email={}", identity.email));
        }
        args.extend(["commit".to_string(), "-m".to_string(), message.to_string()]);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = self
            .runner
            .run(&self.git, &args, repo, &[("GIT_TERMINAL_PROMPT", "0")])
            .await?;

        if output.success {
            debug!(repo = %repo.display(), "changes committed");
            return Ok(Some(output.combined()));
        }

        // "nothing to commit" exits 1 but is not a failure
        let combined = output.combined();
        if combined.contains("nothing to commit") || combined.contains("nothing added to commit") {
            return Ok(None);
        }

        Err(ProcessError::CommandFailed {
            tool: "git".to_string(),
            status: output.status,
            output: combined,
        })
    }

    async fn push(&self, repo: &Path) -> Result<String> {
        self.git(&["push"], repo).await
    }

    async fn pull(&self, repo: &Path) -> Result<String> {
        self.git(&["pull"], repo).await
    }
}

/// Directory name git would pick for a clone of `url`.
///
/// `https://github.com/user/repo.git` -> `repo`,
/// `git@github.com:user/repo` -> `repo`.
pub fn repo_dir_name(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
