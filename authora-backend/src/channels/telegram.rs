use crate::channels::dispatcher::MessageDispatcher;
use crate::channels::types::{ChatTransport, Reply, ReplyFormat, SentMessage};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::requests::Requester;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, User};

/// Messages and button presses bound to one chat, optionally answering a
/// callback query.
pub struct TelegramTransport {
    bot: Bot,
    chat_id: ChatId,
    callback_id: Option<String>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            callback_id: None,
        }
    }

    pub fn for_callback(bot: Bot, chat_id: ChatId, callback_id: String) -> Self {
        Self {
            bot,
            chat_id,
            callback_id: Some(callback_id),
        }
    }

    async fn send_formatted(&self, reply: &Reply, markdown: bool) -> Result<teloxide::types::Message, teloxide::RequestError> {
        let mut request = self
            .bot
            .send_message(self.chat_id, reply.text.clone())
            .disable_web_page_preview(reply.disable_preview);
        if markdown {
            request = request.parse_mode(ParseMode::Markdown);
        }
        if let Some(markup) = keyboard(reply) {
            request = request.reply_markup(markup);
        }
        request.await
    }

    async fn edit_formatted(&self, message_id: MessageId, reply: &Reply, markdown: bool) -> Result<(), teloxide::RequestError> {
        let mut request = self
            .bot
            .edit_message_text(self.chat_id, message_id, reply.text.clone())
            .disable_web_page_preview(reply.disable_preview);
        if markdown {
            request = request.parse_mode(ParseMode::Markdown);
        }
        if let Some(markup) = keyboard(reply) {
            request = request.reply_markup(markup);
        }
        request.await.map(|_| ())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, reply: Reply) -> Result<SentMessage, String> {
        let markdown = reply.format == ReplyFormat::Markdown;
        let sent = match self.send_formatted(&reply, markdown).await {
            Ok(sent) => sent,
            Err(e) if markdown => {
                // names or addresses can carry characters legacy Markdown rejects
                log::warn!("Telegram: Markdown send failed, retrying as plain text: {}", e);
                self.send_formatted(&reply, false)
                    .await
                    .map_err(|e| format!("Failed to send Telegram message: {}", e))?
            }
            Err(e) => return Err(format!("Failed to send Telegram message: {}", e)),
        };
        Ok(SentMessage { id: sent.id.0 })
    }

    async fn edit(&self, message: SentMessage, reply: Reply) -> Result<(), String> {
        let markdown = reply.format == ReplyFormat::Markdown;
        let message_id = MessageId(message.id);
        match self.edit_formatted(message_id, &reply, markdown).await {
            Ok(()) => Ok(()),
            Err(e) if markdown => {
                log::warn!("Telegram: Markdown edit failed, retrying as plain text: {}", e);
                self.edit_formatted(message_id, &reply, false)
                    .await
                    .map_err(|e| format!("Failed to edit Telegram message: {}", e))
            }
            Err(e) => Err(format!("Failed to edit Telegram message: {}", e)),
        }
    }

    async fn delete(&self, message: SentMessage) -> Result<(), String> {
        self.bot
            .delete_message(self.chat_id, MessageId(message.id))
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to delete Telegram message: {}", e))
    }

    async fn acknowledge(&self, text: Option<String>) -> Result<(), String> {
        let Some(callback_id) = &self.callback_id else {
            return Ok(());
        };
        let mut request = self.bot.answer_callback_query(callback_id.clone());
        if let Some(text) = text {
            request = request.text(text);
        }
        request
            .await
            .map(|_| ())
            .map_err(|e| format!("Failed to answer callback query: {}", e))
    }
}

fn keyboard(reply: &Reply) -> Option<InlineKeyboardMarkup> {
    if reply.buttons.is_empty() {
        return None;
    }
    let rows = reply
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    Some(InlineKeyboardMarkup::new(rows))
}

/// Only the configured operator may drive the bot
fn is_owner(user: Option<&User>, owner_id: u64) -> bool {
    user.map(|u| u.id.0 == owner_id).unwrap_or(false)
}

/// Start the Telegram long-polling listener. Returns once polling stops.
pub async fn start_telegram_listener(
    bot_token: String,
    owner_id: u64,
    dispatcher: Arc<MessageDispatcher>,
) -> Result<(), String> {
    let bot = Bot::new(&bot_token);

    log::info!("Telegram: Validating bot token...");
    match bot.get_me().await {
        Ok(me) => {
            log::info!(
                "Telegram: Bot validated - username: @{}, id: {}",
                me.username(),
                me.id
            );
        }
        Err(e) => {
            let error = format!("Invalid Telegram bot token: {}", e);
            log::error!("Telegram: {}", error);
            return Err(error);
        }
    }
    log::info!("Telegram: Accepting updates from operator {} only", owner_id);

    let message_handler = Update::filter_message()
        .filter(move |msg: teloxide::types::Message| {
            let allowed = is_owner(msg.from(), owner_id);
            if !allowed {
                log::warn!(
                    "Telegram: Ignoring message from unauthorized user {:?} in chat {}",
                    msg.from().map(|u| u.id),
                    msg.chat.id
                );
            }
            allowed
        })
        .endpoint(
            |bot: Bot, msg: teloxide::types::Message, dispatcher: Arc<MessageDispatcher>| async move {
                if let Some(text) = msg.text() {
                    log::info!(
                        "Telegram: Message in chat {}: {}",
                        msg.chat.id,
                        if text.len() > 50 {
                            format!("{}...", text.chars().take(50).collect::<String>())
                        } else {
                            text.to_string()
                        }
                    );
                    let transport = TelegramTransport::new(bot, msg.chat.id);
                    dispatcher.dispatch_safe(text, &transport).await;
                } else {
                    log::debug!("Telegram: Ignoring non-text message in chat {}", msg.chat.id);
                }
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            },
        );

    let callback_handler = Update::filter_callback_query()
        .filter(move |q: CallbackQuery| {
            let allowed = is_owner(Some(&q.from), owner_id);
            if !allowed {
                log::warn!("Telegram: Ignoring button press from unauthorized user {}", q.from.id);
            }
            allowed
        })
        .endpoint(
            |bot: Bot, q: CallbackQuery, dispatcher: Arc<MessageDispatcher>| async move {
                let data = q.data.clone().unwrap_or_default();
                log::info!("Telegram: Button press '{}'", data);

                let (chat_id, origin) = match &q.message {
                    Some(message) => (message.chat.id, Some(SentMessage { id: message.id.0 })),
                    None => (ChatId(q.from.id.0 as i64), None),
                };
                let transport = TelegramTransport::for_callback(bot, chat_id, q.id.clone());
                dispatcher.handle_callback_safe(&data, origin, &transport).await;
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            },
        );

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    let mut tg_dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build();

    log::info!("Telegram: Listener started");
    tg_dispatcher.dispatch().await;
    log::info!("Telegram: Listener stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::types::Button;

    #[test]
    fn test_keyboard_rows() {
        assert!(keyboard(&Reply::plain("no buttons")).is_none());

        let reply = Reply::plain("confirm?")
            .with_row(vec![Button::new("Yes", "confirm_tx")])
            .with_row(vec![Button::new("No", "cancel_tx")]);
        let markup = keyboard(&reply).expect("keyboard");
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "Yes");
    }

    #[test]
    fn test_owner_check() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 42,
            "is_bot": false,
            "first_name": "Op"
        }))
        .expect("user");
        assert!(is_owner(Some(&user), 42));
        assert!(!is_owner(Some(&user), 7));
        assert!(!is_owner(None, 42));
    }
}
