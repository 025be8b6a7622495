use async_trait::async_trait;
use tracing::info;

use common::Result;

use crate::message::Notification;
use crate::Notifier;

/// Writes notifications to the log. The fallback channel when nothing else
/// is configured; never fails.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(kind = notification.label(), "\n{}", notification.render_text());
        Ok(())
    }
}
