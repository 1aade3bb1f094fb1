//! Outgoing chat replies and their delivery.

use async_trait::async_trait;
use deckhand_core::{truncate_for_chat, TELEGRAM_MESSAGE_LIMIT};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::{debug, warn};
use url::Url;

/// An inline keyboard button that reports `data` back when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuButton {
    pub label: String,
    pub data: String,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Rows of inline keyboard buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Menu {
    pub rows: Vec<Vec<MenuButton>>,
}

impl Menu {
    /// One button per row.
    pub fn column(buttons: impl IntoIterator<Item = MenuButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    fn to_markup(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(self.rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

/// What a command sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text { text: String, menu: Option<Menu> },
    Photo { url: String, caption: Option<String> },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            menu: None,
        }
    }

    pub fn with_menu(text: impl Into<String>, menu: Menu) -> Self {
        Reply::Text {
            text: text.into(),
            menu: Some(menu),
        }
    }

    pub fn photo(url: impl Into<String>, caption: Option<String>) -> Self {
        Reply::Photo {
            url: url.into(),
            caption,
        }
    }

    /// Text body of a text reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text { text, .. } => Some(text),
            Reply::Photo { .. } => None,
        }
    }
}

/// Delivers replies to a chat.
///
/// Implementations log delivery failures instead of returning them: there
/// is nobody left to report them to.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, menu: Option<&Menu>);

    async fn send_photo(&self, chat_id: i64, url: &str, caption: Option<&str>);

    /// Send any reply, truncating text to the message limit.
    async fn send(&self, chat_id: i64, reply: &Reply) {
        match reply {
            Reply::Text { text, menu } => {
                let text = truncate_for_chat(text, TELEGRAM_MESSAGE_LIMIT);
                self.send_text(chat_id, &text, menu.as_ref()).await;
            }
            Reply::Photo { url, caption } => {
                let caption = caption.as_deref().map(|c| truncate_for_chat(c, CAPTION_LIMIT));
                self.send_photo(chat_id, url, caption.as_deref()).await;
            }
        }
    }
}

/// Maximum photo caption length, in characters.
const CAPTION_LIMIT: usize = 1024;

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, menu: Option<&Menu>) {
        let mut req = self.bot.send_message(ChatId(chat_id), text);
        if let Some(menu) = menu {
            req = req.reply_markup(menu.to_markup());
        }
        match req.await {
            Ok(_) => debug!(chat_id, "Reply sent"),
            Err(e) => warn!(chat_id, error = %e, "Failed to send reply"),
        }
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: Option<&str>) {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(chat_id, error = %e, "Image URL is not valid, sending as text");
                self.send_text(chat_id, url, None).await;
                return;
            }
        };

        let mut req = self.bot.send_photo(ChatId(chat_id), InputFile::url(parsed));
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        if let Err(e) = req.await {
            warn!(chat_id, error = %e, "Failed to send photo, falling back to link");
            self.send_text(chat_id, url, None).await;
        }
    }
}
