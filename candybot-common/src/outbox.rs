use async_trait::async_trait;
use teloxide::types::Recipient;

/// Anything that can deliver a plain text message to a chat.
///
/// Feature code talks to this instead of the bot client directly, so that it can run
/// against a recording double in tests.
#[async_trait]
pub trait Outbox: Send + Sync + 'static {
    async fn send_text(&self, recipient: Recipient, text: String) -> Result<(), anyhow::Error>;
}
