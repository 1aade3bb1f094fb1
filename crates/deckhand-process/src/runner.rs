//! Asynchronous process runner shared by every tool adapter.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, trace};

use crate::{ProcessError, Result};

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Whether the process exited with status 0.
    pub success: bool,
    /// Human-readable exit status.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Stderr followed by stdout, trimmed, without empty sections.
    ///
    /// Used for failure reports where tools write the interesting part to
    /// either stream.
    pub fn combined(&self) -> String {
        [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs external programs without blocking the async runtime.
///
/// Every invocation takes an explicit working directory; the runner never
/// touches the process-wide current directory, so concurrent invocations
/// cannot see each other's location.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Create a runner that kills processes running longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a program and capture its output, whatever the exit status.
    ///
    /// `env` entries are added to the inherited environment of the child
    /// only.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError::Spawn` if the program cannot be started and
    /// `ProcessError::TimedOut` if it exceeds the timeout (the child is
    /// killed).
    pub async fn run(
        &self,
        program: &Path,
        args: &[&str],
        cwd: &Path,
        env: &[(&str, &str)],
    ) -> Result<ToolOutput> {
        let tool = tool_name(program);
        trace!(tool = %tool, args = ?args, cwd = %cwd.display(), "running command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| ProcessError::Spawn {
                tool: tool.clone(),
                source,
            })?,
            Err(_) => {
                debug!(tool = %tool, secs = self.timeout.as_secs(), "command timed out");
                return Err(ProcessError::TimedOut {
                    tool,
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };

        trace!(
            tool = %tool,
            status = %status,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "command completed"
        );

        Ok(ToolOutput {
            success: output.status.success(),
            status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run a program and fail unless it exits successfully.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`run`](Self::run), returns
    /// `ProcessError::CommandFailed` carrying the raw output on a non-zero
    /// exit.
    pub async fn run_checked(
        &self,
        program: &Path,
        args: &[&str],
        cwd: &Path,
        env: &[(&str, &str)],
    ) -> Result<ToolOutput> {
        let output = self.run(program, args, cwd, env).await?;
        if output.success {
            Ok(output)
        } else {
            Err(ProcessError::CommandFailed {
                tool: tool_name(program),
                status: output.status.clone(),
                output: output.combined(),
            })
        }
    }
}

/// Short name of a program for messages, e.g. `/usr/bin/git` -> `git`.
pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string())
}

/// Locate a binary in PATH, falling back to the bare name.
///
/// The fallback keeps construction infallible; a missing binary then
/// surfaces as `ProcessError::Spawn` on first use.
pub(crate) fn locate(binary: &str) -> std::path::PathBuf {
    match which::which(binary) {
        Ok(path) => {
            debug!(binary = %binary, path = %path.display(), "binary found");
            path
        }
        Err(_) => {
            tracing::warn!(binary = %binary, "binary not found in PATH");
            std::path::PathBuf::from(binary)
        }
    }
}
