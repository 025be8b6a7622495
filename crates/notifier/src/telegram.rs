use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

use common::{Error, Result};

use crate::message::Notification;
use crate::Notifier;

/// Sends the plain-text rendering to every configured chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<ChatId>,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_ids: &[i64]) -> Self {
        Self {
            bot: Bot::new(token),
            chat_ids: chat_ids.iter().map(|&id| ChatId(id)).collect(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &str {
        "telegram"
    }

    /// Delivered when at least one chat accepted the message.
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        if self.chat_ids.is_empty() {
            return Err(Error::NotificationDeliveryFailed(
                "telegram: no chat ids configured".to_string(),
            ));
        }

        let text = notification.render_text();
        let mut delivered = 0usize;
        for &chat_id in &self.chat_ids {
            match self.bot.send_message(chat_id, text.clone()).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram notification"),
            }
        }

        if delivered == 0 {
            return Err(Error::NotificationDeliveryFailed(
                "telegram: every chat rejected the message".to_string(),
            ));
        }
        Ok(())
    }
}
