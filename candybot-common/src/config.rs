use itertools::Itertools;
use reqwest::Url;
use teloxide::types::{ChatId, Recipient};

/// Web app opened by the "Play Game" button when `GAME_URL` is not set
pub const DEFAULT_GAME_URL: &str = "https://candyfrontend-production.up.railway.app/";

const REQUIRED_VARS: [&str; 4] = ["BOT_TOKEN", "BACKEND_API", "LEADERBOARD_API", "GROUP_CHAT_ID"];

/// Everything the bot needs to know at startup. Missing required values are fatal.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Account binding endpoint, receives a POST per shared contact
    pub backend_api: Url,
    /// Score list endpoint, polled with GET
    pub leaderboard_api: Url,
    /// Where the scheduled leaderboard goes
    pub group_chat: Recipient,
    pub game_url: Url,
    pub telegram_api_url: Option<Url>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(optional_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let missing = REQUIRED_VARS
            .iter()
            .filter(|name| lookup(name).is_none())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(anyhow::anyhow!(
                "Please configure {} in your .env file",
                missing.iter().join(", ")
            ));
        }
        let required = |name: &str| {
            lookup(name).ok_or_else(|| anyhow::anyhow!("{name} is not set"))
        };

        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            backend_api: parse_url("BACKEND_API", &required("BACKEND_API")?)?,
            leaderboard_api: parse_url("LEADERBOARD_API", &required("LEADERBOARD_API")?)?,
            group_chat: parse_recipient(&required("GROUP_CHAT_ID")?)?,
            game_url: parse_url(
                "GAME_URL",
                &lookup("GAME_URL").unwrap_or_else(|| DEFAULT_GAME_URL.to_string()),
            )?,
            telegram_api_url: lookup("TELEGRAM_API_URL")
                .map(|url| parse_url("TELEGRAM_API_URL", &url))
                .transpose()?,
        })
    }
}

/// Reads an environment variable, treating an empty value the same as an absent one.
pub fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_url(name: &str, value: &str) -> Result<Url, anyhow::Error> {
    value
        .parse()
        .map_err(|err| anyhow::anyhow!("{name} is not a valid URL ({value:?}): {err}"))
}

/// Accepts a numeric chat id or a public `@channel` username.
pub fn parse_recipient(value: &str) -> Result<Recipient, anyhow::Error> {
    if let Ok(id) = value.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if value.len() > 1 && value.starts_with('@') {
        return Ok(Recipient::ChannelUsername(value.to_string()));
    }
    Err(anyhow::anyhow!(
        "GROUP_CHAT_ID must be a chat id or an @channel username, got {value:?}"
    ))
}
