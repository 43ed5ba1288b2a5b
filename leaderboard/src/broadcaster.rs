use std::sync::Arc;
use std::time::Duration;

use candybot_common::outbox::Outbox;
use candybot_common::reqwest::{StatusCode, Url};
use candybot_common::teloxide::types::Recipient;
use candybot_common::utils::requests::{get_with_timeout, API_TIMEOUT};

use crate::digest::{LeaderboardDigest, ScoreEntry, MAX_ENTRIES};

/// How often the leaderboard is posted to the group
pub const BROADCAST_PERIOD: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardFetchError {
    /// The API answered with something other than 200
    Status(u16),
    /// No answer, a timeout, or a body that isn't a score list
    Transport(String),
}

impl LeaderboardFetchError {
    pub fn user_message(&self) -> String {
        match self {
            LeaderboardFetchError::Status(_) => {
                "❌ Unable to fetch leaderboard, please try again later.".to_string()
            }
            LeaderboardFetchError::Transport(err) => {
                format!("❌ Failed to get leaderboard: {err}")
            }
        }
    }
}

/// Fetches the score list and posts the rendered digest, either to whoever asked or to
/// the configured group.
pub struct LeaderboardBroadcaster {
    endpoint: Url,
    outbox: Arc<dyn Outbox>,
    broadcast_target: Recipient,
    timeout: Duration,
}

impl LeaderboardBroadcaster {
    pub fn new(endpoint: Url, outbox: Arc<dyn Outbox>, broadcast_target: Recipient) -> Self {
        Self {
            endpoint,
            outbox,
            broadcast_target,
            timeout: API_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn broadcast_target(&self) -> &Recipient {
        &self.broadcast_target
    }

    /// Returns at most [`MAX_ENTRIES`] entries. Only those have to be well formed.
    pub async fn fetch(&self) -> Result<Vec<ScoreEntry>, LeaderboardFetchError> {
        let response = get_with_timeout(&self.endpoint, self.timeout)
            .await
            .map_err(|err| LeaderboardFetchError::Transport(err.to_string()))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(LeaderboardFetchError::Status(status.as_u16()));
        }
        let raw_entries: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|err| LeaderboardFetchError::Transport(err.to_string()))?;
        raw_entries
            .into_iter()
            .take(MAX_ENTRIES)
            .map(serde_json::from_value)
            .collect::<Result<Vec<ScoreEntry>, _>>()
            .map_err(|err| LeaderboardFetchError::Transport(err.to_string()))
    }

    /// Sends exactly one message to `target`: the digest, or the reason it couldn't be built.
    pub async fn fetch_and_render(&self, target: Recipient) -> Result<(), anyhow::Error> {
        let message = match self.fetch().await {
            Ok(entries) => LeaderboardDigest::from_entries(&entries).to_message(),
            Err(err) => {
                log::warn!("Failed to fetch leaderboard for {target:?}: {err:?}");
                err.user_message()
            }
        };
        self.outbox.send_text(target, message).await
    }

    pub async fn scheduled_broadcast(&self) {
        log::info!("Broadcasting leaderboard to {:?}", self.broadcast_target);
        if let Err(err) = self
            .fetch_and_render(self.broadcast_target.clone())
            .await
        {
            log::warn!(
                "Failed to broadcast leaderboard to {:?}: {err:?}",
                self.broadcast_target
            );
        }
    }
}
