//! Recording fakes for the bot's collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deckhand_github::{GithubError, RemoteFile, RepoHost};
use deckhand_openai::{AiProvider, OpenAiError};
use deckhand_process::{CommandShell, DeployPlatform, ProcessError, SourceControl};
use deckhand_telegram::{
    BotState, ChatTransport, CommandRegistry, Collaborators, Incoming, Menu, Reply, Router,
};
use secrecy::SecretString;
use tempfile::TempDir;

pub const OWNER: u64 = 42;
pub const STRANGER: u64 = 7;
pub const CHAT: i64 = 1000;

/// Every collaborator call, in order, as a readable line.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }
}

pub struct FakeGit {
    log: Arc<CallLog>,
    pub nothing_to_commit: Mutex<bool>,
}

#[async_trait]
impl SourceControl for FakeGit {
    async fn clone_repo(&self, url: &str, dest: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("git clone {}", url));
        std::fs::create_dir_all(dest).unwrap();
        Ok(String::new())
    }

    async fn commit_all(&self, repo: &Path, message: &str) -> deckhand_process::Result<Option<String>> {
        self.log.record(format!("git commit {} {}", dir_name(repo), message));
        if *self.nothing_to_commit.lock().unwrap() {
            Ok(None)
        } else {
            Ok(Some("1 file changed".into()))
        }
    }

    async fn push(&self, repo: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("git push {}", dir_name(repo)));
        Ok(String::new())
    }

    async fn pull(&self, repo: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("git pull {}", dir_name(repo)));
        Ok(String::new())
    }
}

pub struct FakeHeroku {
    log: Arc<CallLog>,
    pub fail_create: Mutex<bool>,
}

#[async_trait]
impl DeployPlatform for FakeHeroku {
    async fn create_app(&self, api_key: &str, app: &str, _cwd: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("heroku create {} key={}", app, api_key));
        if *self.fail_create.lock().unwrap() {
            return Err(ProcessError::CommandFailed {
                tool: "heroku".into(),
                status: "exit code 1".into(),
                output: format!("Name {} is already taken", app),
            });
        }
        Ok(String::new())
    }

    async fn set_remote(&self, api_key: &str, app: &str, cwd: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("heroku git:remote {} {} key={}", app, dir_name(cwd), api_key));
        Ok(String::new())
    }

    async fn push(&self, api_key: &str, cwd: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("heroku push {} key={}", dir_name(cwd), api_key));
        Ok(String::new())
    }

    async fn status(&self, api_key: &str, app: &str, _cwd: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("heroku ps {} key={}", app, api_key));
        Ok("web.1: up 2024/01/01".into())
    }

    async fn logs(&self, api_key: &str, app: &str, _cwd: &Path) -> deckhand_process::Result<String> {
        self.log.record(format!("heroku logs {} key={}", app, api_key));
        Ok("app[web.1]: listening".into())
    }
}

pub struct FakeShell {
    log: Arc<CallLog>,
    pub output: Mutex<String>,
    pub delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[async_trait]
impl CommandShell for FakeShell {
    async fn run(&self, command: &str, _cwd: &Path) -> deckhand_process::Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.log.record(format!("sh {}", command));

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.output.lock().unwrap().clone())
    }
}

/// In-memory repository host.
pub struct FakeRepoHost {
    log: Arc<CallLog>,
    files: Mutex<HashMap<(String, String), RemoteFile>>,
    next_sha: AtomicUsize,
}

#[async_trait]
impl RepoHost for FakeRepoHost {
    async fn get_file(&self, token: &str, repo: &str, path: &str) -> deckhand_github::Result<RemoteFile> {
        self.log.record(format!("github get {} {} token={}", repo, path, token));
        self.files
            .lock()
            .unwrap()
            .get(&(repo.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| GithubError::NotFound(format!("{} in {}", path, repo)))
    }

    async fn put_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> deckhand_github::Result<String> {
        self.log.record(format!(
            "github put {} {} sha={} message={} token={}",
            repo,
            path,
            sha.unwrap_or("-"),
            message,
            token
        ));
        let mut files = self.files.lock().unwrap();
        let key = (repo.to_string(), path.to_string());
        let current = files.get(&key).map(|f| f.sha.clone());
        if current.as_deref() != sha {
            return Err(GithubError::Api {
                status: 409,
                message: format!("{} does not match", sha.unwrap_or("missing sha")),
            });
        }
        let new_sha = format!("sha{}", self.next_sha.fetch_add(1, Ordering::SeqCst));
        files.insert(
            key,
            RemoteFile {
                content: content.to_vec(),
                sha: new_sha.clone(),
            },
        );
        Ok(new_sha)
    }

    async fn delete_file(
        &self,
        token: &str,
        repo: &str,
        path: &str,
        sha: &str,
        message: &str,
    ) -> deckhand_github::Result<()> {
        self.log.record(format!(
            "github delete {} {} sha={} message={} token={}",
            repo, path, sha, message, token
        ));
        let mut files = self.files.lock().unwrap();
        match files.remove(&(repo.to_string(), path.to_string())) {
            Some(_) => Ok(()),
            None => Err(GithubError::NotFound(format!("{} in {}", path, repo))),
        }
    }

    async fn list_repositories(&self, token: &str) -> deckhand_github::Result<Vec<String>> {
        self.log.record(format!("github list token={}", token));
        let files = self.files.lock().unwrap();
        let mut repos: Vec<String> = files.keys().map(|(repo, _)| repo.clone()).collect();
        repos.sort();
        repos.dedup();
        Ok(repos)
    }

    async fn create_repository(&self, token: &str, name: &str) -> deckhand_github::Result<String> {
        self.log.record(format!("github create {} token={}", name, token));
        Ok(format!("octo/{}", name))
    }
}

pub struct FakeAi {
    log: Arc<CallLog>,
    pub fail_with: Mutex<Option<String>>,
}

#[async_trait]
impl AiProvider for FakeAi {
    async fn chat_completion(&self, api_key: &str, prompt: &str) -> deckhand_openai::Result<String> {
        self.log.record(format!("ai chat key={} prompt={}", api_key, prompt));
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(OpenAiError::Api { status: 500, message });
        }
        Ok(format!("answer to {}", prompt))
    }

    async fn generate_image(&self, api_key: &str, prompt: &str) -> deckhand_openai::Result<String> {
        self.log.record(format!("ai image key={} prompt={}", api_key, prompt));
        Ok("https://img.example.com/generated.png".into())
    }
}

/// What the transport was asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { chat_id: i64, text: String, menu: Option<Menu> },
    Photo { chat_id: i64, url: String, caption: Option<String> },
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str, menu: Option<&Menu>) {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
            menu: menu.cloned(),
        });
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: Option<&str>) {
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            url: url.to_string(),
            caption: caption.map(str::to_string),
        });
    }
}

/// A router wired to fakes, with a temporary workspace.
pub struct Harness {
    pub router: Router,
    pub log: Arc<CallLog>,
    pub git: Arc<FakeGit>,
    pub heroku: Arc<FakeHeroku>,
    pub shell: Arc<FakeShell>,
    pub github: Arc<FakeRepoHost>,
    pub ai: Arc<FakeAi>,
    pub transport: Arc<RecordingTransport>,
    pub workspace: PathBuf,
    _dir: TempDir,
}

pub struct HarnessBuilder {
    registry: CommandRegistry,
    openai_fallback: Option<String>,
    github_fallback: Option<String>,
    bot_username: Option<String>,
}

impl HarnessBuilder {
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn openai_fallback(mut self, key: &str) -> Self {
        self.openai_fallback = Some(key.to_string());
        self
    }

    pub fn github_fallback(mut self, token: &str) -> Self {
        self.github_fallback = Some(token.to_string());
        self
    }

    pub fn bot_username(mut self, name: &str) -> Self {
        self.bot_username = Some(name.to_string());
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("workspace");
        let log = Arc::new(CallLog::default());

        let git = Arc::new(FakeGit {
            log: Arc::clone(&log),
            nothing_to_commit: Mutex::new(false),
        });
        let heroku = Arc::new(FakeHeroku {
            log: Arc::clone(&log),
            fail_create: Mutex::new(false),
        });
        let shell = Arc::new(FakeShell {
            log: Arc::clone(&log),
            output: Mutex::new("ok\n".into()),
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let github = Arc::new(FakeRepoHost {
            log: Arc::clone(&log),
            files: Mutex::new(HashMap::new()),
            next_sha: AtomicUsize::new(1),
        });
        let ai = Arc::new(FakeAi {
            log: Arc::clone(&log),
            fail_with: Mutex::new(None),
        });
        let transport = Arc::new(RecordingTransport::default());

        let tools = Collaborators {
            git: git.clone(),
            heroku: heroku.clone(),
            shell: shell.clone(),
            github: github.clone(),
            ai: ai.clone(),
        };
        let state = BotState::new(OWNER, &workspace, tools).with_fallback_credentials(
            self.openai_fallback.map(SecretString::from),
            self.github_fallback.map(SecretString::from),
        );

        let mut router = Router::new(Arc::new(state), self.registry, transport.clone());
        if let Some(name) = self.bot_username {
            router = router.with_bot_username(name);
        }

        Harness {
            router,
            log,
            git,
            heroku,
            shell,
            github,
            ai,
            transport,
            workspace,
            _dir: dir,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            registry: CommandRegistry::default(),
            openai_fallback: None,
            github_fallback: None,
            bot_username: None,
        }
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Route a message and return the reply, without the transport.
    pub async fn send(&self, user_id: u64, text: &str) -> Option<Reply> {
        self.router.route(&Incoming::new(user_id, CHAT, text)).await
    }

    /// Route a message and return the text reply.
    pub async fn text(&self, user_id: u64, text: &str) -> String {
        match self.send(user_id, text).await {
            Some(Reply::Text { text, .. }) => text,
            other => panic!("expected a text reply to {:?}, got {:?}", text, other),
        }
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
