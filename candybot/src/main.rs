use std::sync::Arc;
use std::time::Duration;

use candybot_common::app::App;
use candybot_common::config::{optional_var, BotConfig};
use candybot_common::outbox::Outbox;
use candybot_common::teloxide::adaptors::throttle::Limits;
use candybot_common::teloxide::adaptors::CacheMe;
use candybot_common::teloxide::prelude::{Bot, RequesterExt};
use candybot_common::tgbot::BotData;
use leaderboard::{LeaderboardBroadcaster, LeaderboardModule};
use log::info;
use phone_binding::{BindingCoordinator, PhoneBindingModule, ReferralPolicy, ReferralStore};

fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    let crate_level = if std::env::var("DEBUG").is_ok() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .with_module_level("candybot", crate_level)
        .with_module_level("candybot_common", crate_level)
        .with_module_level("phone_binding", crate_level)
        .with_module_level("leaderboard", crate_level)
        .env()
        .init()?;

    let config = BotConfig::from_env()?;
    let referral_policy = optional_var("REFERRAL_POLICY")
        .map(|policy| policy.parse::<ReferralPolicy>())
        .transpose()?
        .unwrap_or_default();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let app = App::new();

            let mut bot = Bot::with_client(
                config.bot_token.clone(),
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()?,
            );
            if let Some(api_url) = config.telegram_api_url.clone() {
                bot = bot.set_api_url(api_url);
            }
            let bot = Arc::new(
                BotData::new(
                    CacheMe::new(bot.throttle(Limits::default())),
                    app.arc_clone_state(),
                )
                .await?,
            );
            info!("Logged in as @{}", bot.username());

            app.state()
                .add_bot_module(PhoneBindingModule::new(
                    BindingCoordinator::new(
                        config.backend_api.clone(),
                        ReferralStore::new(),
                        referral_policy,
                    ),
                    config.game_url.clone(),
                ))
                .await;
            app.state()
                .add_bot_module(LeaderboardModule::new(LeaderboardBroadcaster::new(
                    config.leaderboard_api.clone(),
                    Arc::clone(&bot) as Arc<dyn Outbox>,
                    config.group_chat.clone(),
                )))
                .await;

            app.start(&bot).await?;

            info!("🤖 Bot started and running! Referral policy: {referral_policy:?}");

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");

            Ok(())
        })
}
