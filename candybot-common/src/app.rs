use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::{ChatId, Message, UserId};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::{bot_commands::MessageCommand, tgbot::BotData};

pub struct App {
    state: Arc<AppState>,
}

impl App {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AppState::new()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn arc_clone_state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Starts every registered module, then begins polling updates for `bot`.
    pub async fn start(&self, bot: &Arc<BotData>) -> Result<(), anyhow::Error> {
        for module in self.state.bot_modules().await.iter() {
            module.start().await?;
            log::info!("Module {} started", module.name());
        }

        bot.start_polling().await?;

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    bot_modules: RwLock<Vec<Arc<dyn BotModule>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            bot_modules: RwLock::new(Vec::new()),
        }
    }

    pub async fn add_bot_module<M: BotModule>(&self, module: impl Into<Arc<M>>) {
        self.bot_modules.write().await.push(module.into());
    }

    pub async fn bot_modules(&self) -> RwLockReadGuard<Vec<Arc<dyn BotModule>>> {
        self.bot_modules.read().await
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait BotModule: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Called once before polling starts. Background tasks are spawned here.
    async fn start(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }

    async fn handle_message(
        &self,
        bot: &BotData,
        user_id: Option<UserId>,
        chat_id: ChatId,
        command: MessageCommand,
        text: &str,
        message: &Message,
    ) -> Result<(), anyhow::Error>;
}
