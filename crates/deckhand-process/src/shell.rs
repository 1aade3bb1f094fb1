//! Arbitrary shell commands for `/exec`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::runner::{locate, ProcessRunner};
use crate::Result;

/// Runs a command line through a shell.
#[async_trait]
pub trait CommandShell: Send + Sync {
    /// Run `command` in `cwd` and return its standard output.
    ///
    /// A non-zero exit is an error carrying the command's stderr.
    async fn run(&self, command: &str, cwd: &Path) -> Result<String>;
}

/// [`CommandShell`] using `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    runner: ProcessRunner,
}

impl ShellRunner {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            shell: locate("sh"),
            runner,
        }
    }
}

#[async_trait]
impl CommandShell for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<String> {
        info!(command = %command, cwd = %cwd.display(), "executing shell command");
        let output = self
            .runner
            .run_checked(&self.shell, &["-c", command], cwd, &[])
            .await?;
        Ok(output.stdout)
    }
}
