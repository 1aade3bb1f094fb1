//! Startup configuration for Deckhand.
//!
//! Everything is read from the environment once, at startup. Missing
//! required values and malformed values are reported as [`ConfigError`]
//! so the binary can exit with a descriptive message instead of failing
//! on the first command.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.deckhand/
//! ├── .env          # Optional secrets file loaded before configuration
//! └── workspace/    # Working tree for clones, deploys and /exec
//! ```
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN` (or `TOKEN`): bot token from @BotFather
//! - `OWNER_ID`: numeric Telegram user id of the owner
//!
//! Optional:
//! - `OPENAI_API_KEY`, `GITHUB_TOKEN`: fallback credentials
//! - `OPENAI_BASE_URL`, `OPENAI_MODEL`, `OPENAI_IMAGE_MODEL`, `OPENAI_IMAGE_SIZE`
//! - `GITHUB_API_URL`, `GITHUB_COMMITTER_NAME`, `GITHUB_COMMITTER_EMAIL`
//! - `DECKHAND_HOME`, `DECKHAND_WORKSPACE_DIR`
//! - `DECKHAND_TOOL_TIMEOUT_SECS`, `DECKHAND_HTTP_TIMEOUT_SECS`

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};

/// Environment variable holding the bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Legacy name for the bot token variable.
pub const BOT_TOKEN_ALIAS_ENV: &str = "TOKEN";

/// Environment variable holding the owner's user id.
pub const OWNER_ID_ENV: &str = "OWNER_ID";

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const OPENAI_MODEL_ENV: &str = "OPENAI_MODEL";
pub const OPENAI_IMAGE_MODEL_ENV: &str = "OPENAI_IMAGE_MODEL";
pub const OPENAI_IMAGE_SIZE_ENV: &str = "OPENAI_IMAGE_SIZE";

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";
pub const GITHUB_COMMITTER_NAME_ENV: &str = "GITHUB_COMMITTER_NAME";
pub const GITHUB_COMMITTER_EMAIL_ENV: &str = "GITHUB_COMMITTER_EMAIL";

/// Environment variable for a custom base directory.
pub const HOME_DIR_ENV: &str = "DECKHAND_HOME";

/// Environment variable for a custom workspace directory.
pub const WORKSPACE_DIR_ENV: &str = "DECKHAND_WORKSPACE_DIR";

pub const TOOL_TIMEOUT_ENV: &str = "DECKHAND_TOOL_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "DECKHAND_HTTP_TIMEOUT_SECS";

/// Default timeout for external processes.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Default timeout for outbound HTTP requests.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

const DEFAULT_HOME_DIR: &str = ".deckhand";
const WORKSPACE_SUBDIR: &str = "workspace";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4";
const DEFAULT_OPENAI_IMAGE_MODEL: &str = "dall-e-2";
const DEFAULT_OPENAI_IMAGE_SIZE: &str = "512x512";

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_COMMITTER_NAME: &str = "Telegram Bot";
const DEFAULT_COMMITTER_EMAIL: &str = "bot@example.com";

/// OpenAI endpoint and model selection.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: Url,
    /// Chat completion model.
    pub model: String,
    /// Image generation model.
    pub image_model: String,
    /// Image size, e.g. `512x512`.
    pub image_size: String,
}

/// GitHub endpoint and committer identity used for file edits.
#[derive(Debug, Clone)]
pub struct GithubSettings {
    /// REST API base, e.g. `https://api.github.com`.
    pub api_url: Url,
    pub committer_name: String,
    pub committer_email: String,
}

/// Complete startup configuration.
#[derive(Debug)]
pub struct Config {
    /// Telegram bot token.
    pub telegram_token: SecretString,
    /// The only user allowed to run owner-only commands.
    pub owner_id: u64,
    /// Fallback OpenAI key for users without a session key.
    pub openai_api_key: Option<SecretString>,
    /// Fallback GitHub token for users without a session token.
    pub github_token: Option<SecretString>,
    pub openai: OpenAiSettings,
    pub github: GithubSettings,
    /// Directory where git, heroku and shell commands run.
    pub workspace_dir: PathBuf,
    /// Timeout applied to every external process.
    pub tool_timeout: Duration,
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when a required variable is absent
    /// and [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = get(BOT_TOKEN_ENV)
            .or_else(|| get(BOT_TOKEN_ALIAS_ENV))
            .map(SecretString::from)
            .ok_or(ConfigError::Missing(BOT_TOKEN_ENV))?;

        let owner_raw = get(OWNER_ID_ENV).ok_or(ConfigError::Missing(OWNER_ID_ENV))?;
        let owner_id = parse_owner_id(&owner_raw)?;

        let openai = OpenAiSettings {
            base_url: parse_url(OPENAI_BASE_URL_ENV, get(OPENAI_BASE_URL_ENV), DEFAULT_OPENAI_BASE_URL)?,
            model: get(OPENAI_MODEL_ENV).unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            image_model: get(OPENAI_IMAGE_MODEL_ENV)
                .unwrap_or_else(|| DEFAULT_OPENAI_IMAGE_MODEL.to_string()),
            image_size: get(OPENAI_IMAGE_SIZE_ENV)
                .unwrap_or_else(|| DEFAULT_OPENAI_IMAGE_SIZE.to_string()),
        };

        let github = GithubSettings {
            api_url: parse_url(GITHUB_API_URL_ENV, get(GITHUB_API_URL_ENV), DEFAULT_GITHUB_API_URL)?,
            committer_name: get(GITHUB_COMMITTER_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_COMMITTER_NAME.to_string()),
            committer_email: get(GITHUB_COMMITTER_EMAIL_ENV)
                .unwrap_or_else(|| DEFAULT_COMMITTER_EMAIL.to_string()),
        };

        let home = home_from(get(HOME_DIR_ENV));
        let workspace_dir = get(WORKSPACE_DIR_ENV)
            .map(|dir| expand(&dir))
            .unwrap_or_else(|| home.join(WORKSPACE_SUBDIR));

        let tool_timeout = parse_secs(TOOL_TIMEOUT_ENV, get(TOOL_TIMEOUT_ENV), DEFAULT_TOOL_TIMEOUT_SECS)?;
        let http_timeout = parse_secs(HTTP_TIMEOUT_ENV, get(HTTP_TIMEOUT_ENV), DEFAULT_HTTP_TIMEOUT_SECS)?;

        let config = Self {
            telegram_token,
            owner_id,
            openai_api_key: get(OPENAI_API_KEY_ENV).map(SecretString::from),
            github_token: get(GITHUB_TOKEN_ENV).map(SecretString::from),
            openai,
            github,
            workspace_dir,
            tool_timeout,
            http_timeout,
        };

        debug!(
            owner_id = config.owner_id,
            workspace = %config.workspace_dir.display(),
            has_openai_key = config.openai_api_key.is_some(),
            has_github_token = config.github_token.is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Override the workspace directory (e.g. from a CLI flag).
    pub fn with_workspace_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.workspace_dir = expand(&dir.as_ref().to_string_lossy());
        self
    }

    /// Create the workspace directory if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_workspace_dir(&self) -> Result<()> {
        if !self.workspace_dir.exists() {
            std::fs::create_dir_all(&self.workspace_dir)?;
        }
        Ok(())
    }
}

/// Get the Deckhand base directory.
///
/// Determined by:
/// 1. `DECKHAND_HOME` environment variable if set (tilde-expanded)
/// 2. `~/.deckhand` if the home directory is available
/// 3. `.deckhand` in the current directory as fallback
pub fn deckhand_home() -> PathBuf {
    home_from(std::env::var(HOME_DIR_ENV).ok().filter(|v| !v.trim().is_empty()))
}

/// Get the `.env` file path inside the base directory.
pub fn env_file() -> PathBuf {
    deckhand_home().join(".env")
}

fn home_from(value: Option<String>) -> PathBuf {
    value.map(|dir| expand(&dir)).unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(DEFAULT_HOME_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR))
    })
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).into_owned())
}

fn parse_owner_id(raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        var: OWNER_ID_ENV,
        reason: format!("expected a numeric Telegram user id, got {:?}", raw),
    })
}

fn parse_url(var: &'static str, value: Option<String>, default: &str) -> Result<Url> {
    let raw = value.unwrap_or_else(|| default.to_string());
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("{} ({:?})", e, raw),
    })
}

fn parse_secs(var: &'static str, value: Option<String>, default: u64) -> Result<Duration> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            reason: "timeout must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a number of seconds, got {:?}", raw),
        }),
    }
}
