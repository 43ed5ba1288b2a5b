pub mod coordinator;
pub mod referrals;

use async_trait::async_trait;
use candybot_common::{
    app::BotModule,
    bot_commands::MessageCommand,
    outbox::Outbox,
    reqwest::Url,
    teloxide::{
        prelude::{ChatId, Message, UserId},
        types::{
            ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
            KeyboardMarkup, WebAppInfo,
        },
    },
    tgbot::{escape, BotData},
};

pub use coordinator::{BindOutcome, BindingCoordinator, BindingRequest, ContactEvent, SenderProfile};
pub use referrals::{build_invite_link, ReferralPolicy, ReferralStore};

/// Label of the reply keyboard button that asks Telegram to share the user's phone number
pub const SEND_PHONE_BUTTON: &str = "📱 Send phone number";

const START_MESSAGE: &str = "Click the button below to link your Telegram phone number:

• Used for security verification and in-game privileges
• Your info will never be leaked, only for identity verification";

const HELP_MESSAGE: &str = "👋 Send /start to begin linking your phone number.
If you encounter any issues, please contact the administrator.";

/// What a single message asks this module to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// A shared contact, or the button label typed by hand
    Bind,
    Start { referral: String },
    Share,
    Help,
    Ignore,
}

/// A contact wins over whatever command the message may also carry.
fn route(command: &MessageCommand, has_contact: bool, text: &str) -> Action {
    if has_contact || text == SEND_PHONE_BUTTON {
        return Action::Bind;
    }
    match command {
        MessageCommand::Start(data) => Action::Start {
            referral: data.clone(),
        },
        command if command.is("share") => Action::Share,
        command if command.is("help") => Action::Help,
        _ => Action::Ignore,
    }
}

/// `/start`, `/share`, `/help` and shared contacts.
pub struct PhoneBindingModule {
    coordinator: BindingCoordinator,
    game_url: Url,
}

impl PhoneBindingModule {
    pub fn new(coordinator: BindingCoordinator, game_url: Url) -> Self {
        Self {
            coordinator,
            game_url,
        }
    }

    async fn send_start(&self, bot: &BotData, chat_id: ChatId) -> Result<(), anyhow::Error> {
        let reply_markup = KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(SEND_PHONE_BUTTON).request(ButtonRequest::Contact)
        ]])
        .one_time_keyboard()
        .resize_keyboard();
        bot.send_text_message(chat_id, escape(START_MESSAGE), reply_markup)
            .await?;
        Ok(())
    }

    async fn send_invite_link(
        &self,
        bot: &BotData,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<(), anyhow::Error> {
        let invite_link = build_invite_link(bot.username(), user_id);
        let message = format!(
            "🎉 Your exclusive invitation link:\n\n{}\n\nInvite friends to join and bind their phone number via your link to earn extra Token rewards\\!",
            escape(&invite_link)
        );
        let reply_markup = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
            "🔗 Invite friends",
            invite_link.parse()?,
        )]]);
        bot.send_text_message(chat_id, message, reply_markup)
            .await?;
        Ok(())
    }

    async fn bind(
        &self,
        bot: &BotData,
        chat_id: ChatId,
        event: &ContactEvent,
    ) -> Result<(), anyhow::Error> {
        let outcome = self.coordinator.bind_phone(event).await;
        if outcome.is_bound() {
            let reply_markup =
                InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::web_app(
                    "🚀 Play Game",
                    WebAppInfo {
                        url: self.game_url.clone(),
                    },
                )]]);
            bot.send_text_message(chat_id, escape(&outcome.user_message()), reply_markup)
                .await?;
        } else {
            bot.send_text(chat_id.into(), outcome.user_message())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BotModule for PhoneBindingModule {
    fn name(&self) -> &'static str {
        "Phone Binding"
    }

    async fn handle_message(
        &self,
        bot: &BotData,
        user_id: Option<UserId>,
        chat_id: ChatId,
        command: MessageCommand,
        text: &str,
        message: &Message,
    ) -> Result<(), anyhow::Error> {
        let Some(user_id) = user_id else {
            return Ok(());
        };

        match route(&command, message.contact().is_some(), text) {
            Action::Bind => {
                if let Some(event) = ContactEvent::from_message(message) {
                    self.bind(bot, chat_id, &event).await?;
                }
            }
            Action::Start { referral } => {
                self.coordinator.record_referral(user_id, &referral);
                self.send_start(bot, chat_id).await?;
            }
            Action::Share => {
                self.send_invite_link(bot, user_id, chat_id).await?;
            }
            Action::Help => {
                bot.send_text(chat_id.into(), HELP_MESSAGE.to_string())
                    .await?;
            }
            Action::Ignore => {}
        }
        Ok(())
    }
}
