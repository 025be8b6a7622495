pub mod discord;
pub mod dispatcher;
pub mod log;
pub mod message;
pub mod telegram;

pub use discord::DiscordWebhook;
pub use dispatcher::Dispatcher;
pub use log::LogNotifier;
pub use message::{AlertMessage, Notification};
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use common::Result;

/// A channel that can deliver a notification to humans.
///
/// Implementations report failure as `NotificationDeliveryFailed`; they never
/// retry. The next scheduler cycle re-evaluates the item anyway.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs ("discord", "telegram", ...).
    fn channel(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}
