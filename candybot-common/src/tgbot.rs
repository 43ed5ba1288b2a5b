use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use teloxide::adaptors::throttle::Throttle;
use teloxide::adaptors::CacheMe;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::payloads::{SendDocumentSetters, SendMessageSetters};
use teloxide::prelude::{dptree, ChatId, Dispatcher, Message, Requester, Update};
use teloxide::types::{InputFile, LinkPreviewOptions, ParseMode, Recipient, ReplyMarkup};
use teloxide::utils::markdown;
use teloxide::{ApiError, Bot, RequestError};

use crate::app::AppState;
use crate::bot_commands::MessageCommand;
use crate::outbox::Outbox;

pub type TgBot = CacheMe<Throttle<Bot>>;

/// Telegram rejects longer messages, those are sent as a text file instead
const MESSAGE_LENGTH_LIMIT: usize = 4096;

pub struct BotData {
    bot: TgBot,
    username: String,
    state: Arc<AppState>,
}

impl BotData {
    pub async fn new(bot: TgBot, state: Arc<AppState>) -> Result<Self, anyhow::Error> {
        let me = bot.get_me().await?;
        let username = me
            .username
            .clone()
            .ok_or_else(|| anyhow::anyhow!("Bot has no username"))?;
        Ok(Self {
            bot,
            username,
            state,
        })
    }

    /// Spawns the update dispatcher and returns. Every message is handled in its own task
    /// and offered to every registered module.
    pub async fn start_polling(self: &Arc<Self>) -> Result<(), anyhow::Error> {
        let bot = self.bot.clone();
        let (msg_sender, mut msg_receiver) = tokio::sync::mpsc::channel(1000);

        tokio::spawn(async move {
            let handler = dptree::entry().branch(Update::filter_message().endpoint(
                move |msg: Message| {
                    let msg_sender = msg_sender.clone();
                    async move {
                        if msg_sender.send(msg).await.is_err() {
                            warn!("Message receiver is gone, dropping update");
                        }
                        Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                    }
                },
            ));
            Dispatcher::builder(bot, handler).build().dispatch().await;
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(msg) = msg_receiver.recv().await {
                let bot = Arc::clone(&this);
                tokio::spawn(async move {
                    bot.dispatch_message(msg).await;
                });
            }
        });
        log::info!("Polling updates for @{}", self.username);
        Ok(())
    }

    async fn dispatch_message(&self, msg: Message) {
        let text = msg.text().or(msg.caption()).unwrap_or_default();
        let user_id = msg.from.as_ref().map(|u| u.id);
        let command = MessageCommand::parse(text);
        log::debug!(
            "chat={:?} user={user_id:?} command={command:?}: {text}",
            msg.chat.id
        );
        for module in self.state.bot_modules().await.iter() {
            let result = module
                .handle_message(self, user_id, msg.chat.id, command.clone(), text, &msg)
                .await;
            if let Err(err) = result {
                warn!(
                    "Error handling message {} in module {}: {:?}",
                    text,
                    module.name(),
                    err
                );
            }
        }
    }

    /// Username without the leading `@`
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sends a MarkdownV2 message. Callers are responsible for escaping.
    pub async fn send_text_message(
        &self,
        chat_id: ChatId,
        message: String,
        reply_markup: impl Into<ReplyMarkup>,
    ) -> Result<Message, anyhow::Error> {
        if message.len() >= MESSAGE_LENGTH_LIMIT {
            return self
                .send_as_document(chat_id.into(), unescape_markdown(message))
                .await;
        }
        Ok(self
            .bot
            .send_message(chat_id, &message)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(reply_markup)
            .link_preview_options(no_link_preview())
            .await
            .inspect_err(log_parse_error(message))?)
    }

    /// Sends text as is, without any formatting.
    pub async fn send_plain_text_message(
        &self,
        recipient: Recipient,
        message: String,
    ) -> Result<Message, anyhow::Error> {
        if message.len() >= MESSAGE_LENGTH_LIMIT {
            return self.send_as_document(recipient, message).await;
        }
        Ok(self
            .bot
            .send_message(recipient, message)
            .link_preview_options(no_link_preview())
            .await?)
    }

    async fn send_as_document(
        &self,
        recipient: Recipient,
        content: String,
    ) -> Result<Message, anyhow::Error> {
        Ok(self
            .bot
            .send_document(
                recipient,
                InputFile::memory(content).file_name("message.txt"),
            )
            .caption("The response was too long, so it was sent as a file\\.")
            .parse_mode(ParseMode::MarkdownV2)
            .await?)
    }
}

#[async_trait]
impl Outbox for BotData {
    async fn send_text(&self, recipient: Recipient, text: String) -> Result<(), anyhow::Error> {
        self.send_plain_text_message(recipient, text).await?;
        Ok(())
    }
}

fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn unescape_markdown(text: String) -> String {
    const CHARS: [char; 19] = [
        '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
        '!',
    ];

    let mut text = text;
    for c in CHARS {
        text = text.replace(&format!("\\{c}"), &c.to_string());
    }
    text
}

/// Escapes user supplied text for [`BotData::send_text_message`].
pub fn escape(text: &str) -> String {
    markdown::escape(text)
}

fn log_parse_error(text: impl Into<String>) -> impl FnOnce(&RequestError) {
    let text = text.into();
    move |err| {
        if let RequestError::Api(ApiError::CantParseEntities(s)) = err {
            log::warn!("Can't parse entities in message: {s}\n{text:?}");
        }
    }
}
