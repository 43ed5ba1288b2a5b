pub mod broadcaster;
pub mod digest;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use candybot_common::{
    app::BotModule,
    bot_commands::MessageCommand,
    teloxide::prelude::{ChatId, Message, UserId},
    tgbot::BotData,
    utils::schedule::RepeatingTask,
};

pub use broadcaster::{LeaderboardBroadcaster, LeaderboardFetchError, BROADCAST_PERIOD};
pub use digest::{mask_phone, rank_decoration, LeaderboardDigest, ScoreEntry};

/// `/leaderboard` on demand, and the same digest posted to the group on a timer.
pub struct LeaderboardModule {
    broadcaster: Arc<LeaderboardBroadcaster>,
    broadcast_task: OnceLock<RepeatingTask>,
}

impl LeaderboardModule {
    pub fn new(broadcaster: LeaderboardBroadcaster) -> Self {
        Self {
            broadcaster: Arc::new(broadcaster),
            broadcast_task: OnceLock::new(),
        }
    }
}

#[async_trait]
impl BotModule for LeaderboardModule {
    fn name(&self) -> &'static str {
        "Leaderboard"
    }

    async fn start(&self) -> Result<(), anyhow::Error> {
        if self.broadcast_task.get().is_some() {
            return Err(anyhow::anyhow!("Leaderboard broadcast is already running"));
        }
        let broadcaster = Arc::clone(&self.broadcaster);
        let task = RepeatingTask::spawn(BROADCAST_PERIOD, move || {
            let broadcaster = Arc::clone(&broadcaster);
            async move { broadcaster.scheduled_broadcast().await }
        });
        if self.broadcast_task.set(task).is_err() {
            return Err(anyhow::anyhow!("Leaderboard broadcast is already running"));
        }
        log::info!(
            "Leaderboard will be posted to {:?} every {BROADCAST_PERIOD:?}",
            self.broadcaster.broadcast_target(),
        );
        Ok(())
    }

    async fn handle_message(
        &self,
        _bot: &BotData,
        _user_id: Option<UserId>,
        chat_id: ChatId,
        command: MessageCommand,
        _text: &str,
        _message: &Message,
    ) -> Result<(), anyhow::Error> {
        if command.is("leaderboard") {
            self.broadcaster.fetch_and_render(chat_id.into()).await?;
        }
        Ok(())
    }
}
