pub mod app;
pub mod bot_commands;
pub mod config;
pub mod outbox;
pub mod tgbot;
pub mod utils;

pub use reqwest;
pub use teloxide;
