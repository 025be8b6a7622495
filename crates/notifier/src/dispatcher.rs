use async_trait::async_trait;
use tracing::{debug, warn};

use common::{Error, Result};

use crate::message::Notification;
use crate::Notifier;

/// Fans a notification out to every configured channel.
///
/// Delivery counts as successful when at least one channel accepted it.
/// Per-channel failures are logged and swallowed.
#[derive(Default)]
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Box<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn push(&mut self, channel: Box<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel()).collect()
    }
}

#[async_trait]
impl Notifier for Dispatcher {
    fn channel(&self) -> &str {
        "dispatcher"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut delivered = 0usize;
        for channel in &self.channels {
            match channel.deliver(notification).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(channel = channel.channel(), kind = notification.label(), "Delivered");
                }
                Err(e) => {
                    warn!(channel = channel.channel(), kind = notification.label(), error = %e, "Channel delivery failed");
                }
            }
        }

        if delivered == 0 {
            return Err(Error::NotificationDeliveryFailed(format!(
                "no channel delivered the {} ({} configured)",
                notification.label(),
                self.channels.len()
            )));
        }
        Ok(())
    }
}
