//! Shared state for the Telegram bot.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use deckhand_core::Config;
use deckhand_github::{GithubClient, RepoHost};
use deckhand_openai::{AiProvider, OpenAiClient};
use deckhand_process::{
    CommandShell, DeployPlatform, GitCli, HerokuCli, ProcessRunner, ShellRunner, SourceControl,
};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{BotError, CommandError, CommandResult, Result};
use crate::session::SessionStore;

/// External systems the handlers talk to.
#[derive(Clone)]
pub struct Collaborators {
    pub git: Arc<dyn SourceControl>,
    pub heroku: Arc<dyn DeployPlatform>,
    pub shell: Arc<dyn CommandShell>,
    pub github: Arc<dyn RepoHost>,
    pub ai: Arc<dyn AiProvider>,
}

impl Collaborators {
    /// Real CLI and HTTP adapters built from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let runner = ProcessRunner::new(config.tool_timeout);
        let git = GitCli::new(runner.clone())
            .with_identity(&config.github.committer_name, &config.github.committer_email);
        let github = GithubClient::new(&config.github, config.http_timeout).map_err(|e| {
            BotError::Client {
                service: "GitHub",
                message: e.to_string(),
            }
        })?;
        let ai = OpenAiClient::new(&config.openai, config.http_timeout).map_err(|e| {
            BotError::Client {
                service: "OpenAI",
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            git: Arc::new(git),
            heroku: Arc::new(HerokuCli::new(runner.clone())),
            shell: Arc::new(ShellRunner::new(runner)),
            github: Arc::new(github),
            ai: Arc::new(ai),
        })
    }
}

/// State shared by every handler invocation.
pub struct BotState {
    pub sessions: SessionStore,
    pub owner_id: u64,
    /// Root for clones, deploys and `/exec`.
    pub workspace: PathBuf,
    pub tools: Collaborators,
    openai_fallback: Option<SecretString>,
    github_fallback: Option<SecretString>,
}

impl BotState {
    pub fn new(owner_id: u64, workspace: impl Into<PathBuf>, tools: Collaborators) -> Self {
        Self {
            sessions: SessionStore::new(),
            owner_id,
            workspace: workspace.into(),
            tools,
            openai_fallback: None,
            github_fallback: None,
        }
    }

    /// State for a loaded configuration.
    pub fn from_config(config: &Config, tools: Collaborators) -> Self {
        let copy = |secret: &Option<SecretString>| {
            secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_string()))
        };
        Self::new(config.owner_id, &config.workspace_dir, tools)
            .with_fallback_credentials(copy(&config.openai_api_key), copy(&config.github_token))
    }

    /// Credentials used when a user has not set their own.
    pub fn with_fallback_credentials(
        mut self,
        openai: Option<SecretString>,
        github: Option<SecretString>,
    ) -> Self {
        self.openai_fallback = openai;
        self.github_fallback = github;
        self
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        user_id == self.owner_id
    }

    /// OpenAI key for `user_id`: the session's, else the configured one.
    pub async fn openai_key(&self, user_id: u64) -> CommandResult<String> {
        let session = self.sessions.get(user_id).await.and_then(|s| s.openai_key);
        session
            .or_else(|| self.openai_fallback.as_ref().map(|k| k.expose_secret().to_string()))
            .ok_or_else(|| {
                CommandError::bad_request("Please set your OpenAI API key first using /setopenai.")
            })
    }

    /// GitHub token for `user_id`: the session's, else the configured one.
    pub async fn github_token(&self, user_id: u64) -> CommandResult<String> {
        let session = self.sessions.get(user_id).await.and_then(|s| s.github_token);
        session
            .or_else(|| self.github_fallback.as_ref().map(|t| t.expose_secret().to_string()))
            .ok_or_else(|| {
                CommandError::Unauthorized(
                    "No GitHub token configured. Set one with /setgithub.".to_string(),
                )
            })
    }

    /// Heroku key and app name, both required by every Heroku command.
    pub async fn heroku_target(&self, user_id: u64) -> CommandResult<(String, String)> {
        let session = self.sessions.get(user_id).await.unwrap_or_default();
        let key = session.heroku_key.ok_or_else(|| {
            CommandError::bad_request("Please set your Heroku API key first using /setheroku.")
        })?;
        let app = session.app_name.ok_or_else(|| {
            CommandError::bad_request("Please set your Heroku app name first using /setappname.")
        })?;
        Ok((key, app))
    }

    /// Resolve a user-supplied repository path inside the workspace.
    pub fn repo_path(&self, relative: &str) -> CommandResult<PathBuf> {
        resolve_in(&self.workspace, relative)
    }

    /// Create the workspace if needed.
    pub fn ensure_workspace(&self) -> CommandResult<()> {
        std::fs::create_dir_all(&self.workspace).map_err(|e| CommandError::ToolFailure {
            tool: "workspace".to_string(),
            output: e.to_string(),
        })
    }
}

/// Join `relative` onto `root`, rejecting anything that could leave it.
pub(crate) fn resolve_in(root: &Path, relative: &str) -> CommandResult<PathBuf> {
    let relative = relative.trim();
    let path = Path::new(relative);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || escapes {
        return Err(CommandError::bad_request(format!(
            "Path must be relative to the workspace: {}",
            relative
        )));
    }
    Ok(root.join(path))
}
