//! Deckhand: a Telegram bot that lets its owner drive GitHub, Heroku and
//! OpenAI from a chat.
//!
//! # Architecture
//!
//! - [`SessionStore`] keeps per-user credentials and the target Heroku app.
//! - [`Router`] parses slash commands, enforces owner-only access and turns
//!   every handler error into one reply.
//! - Handlers reach git, Heroku, the shell, GitHub and OpenAI through the
//!   traits collected in [`Collaborators`], so tests can swap in fakes.
//! - [`DeckhandBot`] connects the router to Telegram with teloxide.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN` (or `TOKEN`): Bot token from @BotFather
//! - `OWNER_ID`: numeric Telegram user id allowed to run owner-only commands
//!
//! See [`deckhand_core::config`] for the optional settings.
//!
//! # Commands
//!
//! - `/start`, `/help` - open to everyone
//! - `/setopenai`, `/setheroku`, `/setappname`, `/setgithub` - session settings
//! - `/deploy`, `/status`, `/logs` - Heroku
//! - `/exec`, `/ai` (or `dk ai ...` in any message) - shell and OpenAI
//! - `/github_help` and the GitHub commands it lists

pub mod bot;
pub mod command;
pub mod error;
pub mod handlers;
pub mod reply;
pub mod router;
pub mod session;
pub mod state;

pub use bot::DeckhandBot;
pub use command::{Access, CommandId, CommandRegistry, CommandSpec};
pub use error::{BotError, CommandError, CommandResult, Result};
pub use reply::{ChatTransport, Menu, MenuButton, Reply, TelegramTransport};
pub use router::{Incoming, Router, PERMISSION_DENIED};
pub use session::{SessionStore, UserSession};
pub use state::{BotState, Collaborators};
