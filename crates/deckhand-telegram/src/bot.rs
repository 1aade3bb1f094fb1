//! Telegram wiring: long polling, update filtering and menu callbacks.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, UserId};
use tracing::{debug, info, warn};

use crate::command::CommandRegistry;
use crate::error::Result;
use crate::handlers::menu_selection_text;
use crate::reply::{ChatTransport, TelegramTransport};
use crate::router::{Incoming, Router};
use crate::state::BotState;

/// The Deckhand bot.
pub struct DeckhandBot {
    bot: Bot,
    state: Arc<BotState>,
    registry: CommandRegistry,
}

impl DeckhandBot {
    pub fn new(token: &str, state: Arc<BotState>) -> Self {
        Self {
            bot: Bot::new(token),
            state,
            registry: CommandRegistry::default(),
        }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self.bot.get_me().await?;
        Ok(me.username().to_string())
    }

    /// Publish the command list shown in Telegram's command menu.
    pub async fn register_commands(&self) -> Result<()> {
        self.bot.set_my_commands(self.registry.bot_commands()).await?;
        info!(count = self.registry.iter().count(), "Bot commands registered");
        Ok(())
    }

    /// Run until Ctrl+C.
    pub async fn start_polling(self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let username = self.get_me().await?;
        if let Err(e) = self.register_commands().await {
            warn!(error = %e, "Could not register bot commands");
        }

        let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(self.bot.clone()));
        let router = Arc::new(
            Router::new(Arc::clone(&self.state), self.registry.clone(), transport)
                .with_bot_username(username.clone()),
        );

        let router_for_messages = Arc::clone(&router);

        let handler = dptree::entry()
            .branch(Update::filter_callback_query().endpoint(
                |bot: Bot, q: CallbackQuery| async move { handle_menu_callback(bot, q).await },
            ))
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some() && msg.from.is_some())
                    .endpoint(move |msg: Message| {
                        let router = Arc::clone(&router_for_messages);
                        async move {
                            if let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) {
                                debug!(chat_id = %msg.chat.id, user_id = user.id.0, "Text message received");
                                router
                                    .dispatch(Incoming::new(user.id.0, msg.chat.id.0, text))
                                    .await;
                            }
                            respond(())
                        }
                    }),
            );

        info!(username = %username, "Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), handler)
            .distribution_function(update_sender)
            .default_handler(|upd| async move {
                debug!("Unhandled update: {:?}", upd.kind);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

/// Replace the `/start` menu with the chosen section's hint.
async fn handle_menu_callback(bot: Bot, q: CallbackQuery) -> ResponseResult<()> {
    // Always answer so the client stops showing a spinner
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(text) = q.data.as_deref().and_then(menu_selection_text) else {
        debug!(data = ?q.data, "Ignoring unknown callback");
        return Ok(());
    };

    if let Some(message) = q.message.as_ref() {
        let chat_id = message.chat().id;
        if let Err(e) = bot.edit_message_text(chat_id, message.id(), text).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to edit menu message");
        }
    }
    Ok(())
}

/// Distribution key for updates: the sender, so one user's updates are
/// handled in order.
fn update_sender(update: &Update) -> Option<UserId> {
    update.from().map(|user| user.id)
}
