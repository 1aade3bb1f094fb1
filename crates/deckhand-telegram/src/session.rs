//! Per-user settings kept for the lifetime of the process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Credentials and deployment target of one user.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub openai_key: Option<String>,
    pub heroku_key: Option<String>,
    pub app_name: Option<String>,
    pub github_token: Option<String>,
}

impl fmt::Debug for UserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "[REDACTED]"
            } else {
                "None"
            }
        }
        f.debug_struct("UserSession")
            .field("openai_key", &redact(&self.openai_key))
            .field("heroku_key", &redact(&self.heroku_key))
            .field("app_name", &self.app_name)
            .field("github_token", &redact(&self.github_token))
            .finish()
    }
}

/// Map of user id to session.
///
/// The map itself is only write-locked to insert a new user; field updates
/// lock that user's entry alone, so users never contend with each other.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<u64, Arc<Mutex<UserSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user's session, if one was ever created.
    pub async fn get(&self, user_id: u64) -> Option<UserSession> {
        let entry = self.sessions.read().await.get(&user_id).cloned()?;
        let session = entry.lock().await;
        Some(session.clone())
    }

    /// Number of users with a session.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn set_openai_key(&self, user_id: u64, key: impl Into<String>) {
        let key = key.into();
        self.update(user_id, "openai_key", move |s| s.openai_key = Some(key)).await;
    }

    pub async fn set_heroku_key(&self, user_id: u64, key: impl Into<String>) {
        let key = key.into();
        self.update(user_id, "heroku_key", move |s| s.heroku_key = Some(key)).await;
    }

    pub async fn set_app_name(&self, user_id: u64, name: impl Into<String>) {
        let name = name.into();
        self.update(user_id, "app_name", move |s| s.app_name = Some(name)).await;
    }

    pub async fn set_github_token(&self, user_id: u64, token: impl Into<String>) {
        let token = token.into();
        self.update(user_id, "github_token", move |s| s.github_token = Some(token)).await;
    }

    async fn update<F>(&self, user_id: u64, field: &'static str, apply: F)
    where
        F: FnOnce(&mut UserSession),
    {
        let entry = self.entry(user_id).await;
        let mut session = entry.lock().await;
        apply(&mut session);
        debug!(user_id, field, "Session updated");
    }

    async fn entry(&self, user_id: u64) -> Arc<Mutex<UserSession>> {
        if let Some(entry) = self.sessions.read().await.get(&user_id) {
            return Arc::clone(entry);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(user_id).or_insert_with(|| {
            debug!(user_id, "Session created");
            Arc::new(Mutex::new(UserSession::default()))
        }))
    }
}
