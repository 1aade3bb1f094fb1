//! Turns incoming text into at most one reply.
//!
//! Routing is an ordered rule table evaluated top to bottom:
//!
//! 1. a registered slash command runs its handler,
//! 2. otherwise, a message from the owner containing `dk ai` is an AI request,
//! 3. otherwise nothing happens.
//!
//! Owner-only commands from anyone else are answered with a fixed refusal
//! before the handler is looked at. Handler errors become a single reply.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::command::{parse_slash, split_args, Access, CommandRegistry, CommandSpec};
use crate::error::CommandResult;
use crate::handlers::{self, CommandContext};
use crate::reply::{ChatTransport, Reply};
use crate::state::BotState;

/// Reply to a non-owner invoking an owner-only command.
pub const PERMISSION_DENIED: &str = "You don't have permission to use this command.";

/// A text message as seen by the router.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub user_id: u64,
    pub chat_id: i64,
    pub text: String,
}

impl Incoming {
    pub fn new(user_id: u64, chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    SlashCommand,
    AiTrigger,
}

const RULES: &[Rule] = &[Rule::SlashCommand, Rule::AiTrigger];

enum Route<'a> {
    Command { spec: &'a CommandSpec, rest: &'a str },
    Ai { request: String },
}

/// Free-text AI trigger, matched anywhere in a message.
static AI_TRIGGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)dk ai").expect("Invalid AI trigger regex"));

/// The request part of a `dk ai` message: the first trigger removed, trimmed.
pub fn ai_request_text(text: &str) -> Option<String> {
    if !AI_TRIGGER.is_match(text) {
        return None;
    }
    Some(AI_TRIGGER.replacen(text, 1, "").trim().to_string())
}

/// Command dispatcher.
pub struct Router {
    state: Arc<BotState>,
    registry: CommandRegistry,
    transport: Arc<dyn ChatTransport>,
    bot_username: Option<String>,
    /// Per-user FIFO lanes; a user's commands never overlap. Only users
    /// with a matched message in flight have an entry.
    lanes: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl Router {
    pub fn new(state: Arc<BotState>, registry: CommandRegistry, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            state,
            registry,
            transport,
            bot_username: None,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Ignore commands addressed to other bots (`/cmd@otherbot`).
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    /// Route a message and deliver the reply, if any.
    ///
    /// Messages from the same user are processed one at a time in arrival
    /// order, reply included. Messages that match no rule are dropped
    /// without taking a lane.
    pub async fn dispatch(&self, msg: Incoming) {
        let Some(route) = self.resolve(&msg) else {
            return;
        };

        let lane = self.lane(msg.user_id).await;
        {
            let _turn = lane.lock().await;
            let reply = self.run(route, &msg).await;
            self.transport.send(msg.chat_id, &reply).await;
        }
        self.release_lane(msg.user_id, lane).await;
    }

    /// Compute the reply for a message without sending it.
    pub async fn route(&self, msg: &Incoming) -> Option<Reply> {
        let route = self.resolve(msg)?;
        Some(self.run(route, msg).await)
    }

    /// Number of users with a lane, i.e. with a message being handled.
    pub async fn active_lanes(&self) -> usize {
        self.lanes.lock().await.len()
    }

    fn resolve<'a>(&'a self, msg: &'a Incoming) -> Option<Route<'a>> {
        RULES.iter().find_map(|rule| self.match_rule(*rule, msg))
    }

    async fn run(&self, route: Route<'_>, msg: &Incoming) -> Reply {
        let result = match route {
            Route::Command { spec, rest } => {
                if spec.access == Access::OwnerOnly && !self.state.is_owner(msg.user_id) {
                    warn!(user_id = msg.user_id, command = spec.name, "Permission denied");
                    return Reply::text(PERMISSION_DENIED);
                }
                info!(user_id = msg.user_id, chat_id = msg.chat_id, command = spec.name, "Command matched");
                self.run_command(spec, rest, msg).await
            }
            Route::Ai { request } => {
                info!(user_id = msg.user_id, chat_id = msg.chat_id, command = "dk ai", "AI trigger matched");
                handlers::ai_request(&self.state, msg.user_id, &request).await
            }
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user_id = msg.user_id, kind = e.kind(), error = %e, "Command failed");
                Reply::text(e.to_reply_text())
            }
        }
    }

    async fn run_command(&self, spec: &CommandSpec, rest: &str, msg: &Incoming) -> CommandResult<Reply> {
        let ctx = CommandContext {
            user_id: msg.user_id,
            chat_id: msg.chat_id,
            args: split_args(spec, rest)?,
        };
        handlers::execute(spec.id, &self.state, &self.registry, &ctx).await
    }

    fn match_rule<'a>(&'a self, rule: Rule, msg: &'a Incoming) -> Option<Route<'a>> {
        match rule {
            Rule::SlashCommand => {
                let cmd = parse_slash(&msg.text, self.bot_username.as_deref())?;
                let spec = self.registry.get(cmd.name)?;
                Some(Route::Command { spec, rest: cmd.rest })
            }
            Rule::AiTrigger => {
                if !self.state.is_owner(msg.user_id) {
                    return None;
                }
                let request = ai_request_text(&msg.text)?;
                Some(Route::Ai { request })
            }
        }
    }

    async fn lane(&self, user_id: u64) -> Arc<Mutex<()>> {
        let mut lanes = self.lanes.lock().await;
        Arc::clone(lanes.entry(user_id).or_default())
    }

    /// Drop the user's lane unless another message is queued on it.
    async fn release_lane(&self, user_id: u64, lane: Arc<Mutex<()>>) {
        let mut lanes = self.lanes.lock().await;
        // One reference in the map, one held here
        if Arc::strong_count(&lane) == 2 {
            lanes.remove(&user_id);
        }
    }
}
