use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use common::{Error, Result};

use crate::message::{AlertMessage, Notification};
use crate::Notifier;

const GREEN: u32 = 0x00ff00;
const BLUE: u32 = 0x3498db;

/// Posts notifications to a Discord channel webhook.
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
    username: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: url.into(),
            username: "Skinwatch".to_string(),
        })
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    fn payload(&self, notification: &Notification) -> Value {
        match notification {
            Notification::Alert(alert) => json!({
                "username": self.username,
                "embeds": [alert_embed(alert)],
            }),
            Notification::DailySummary(_) => json!({
                "username": self.username,
                "embeds": [{
                    "title": "Daily summary",
                    "description": notification.render_text(),
                    "color": BLUE,
                }],
            }),
            Notification::Startup { .. } => json!({
                "username": self.username,
                "content": notification.render_text(),
            }),
        }
    }
}

fn alert_embed(alert: &AlertMessage) -> Value {
    let field = |name: &str, value: String| json!({ "name": name, "value": value, "inline": true });

    json!({
        "title": alert.title,
        "description": format!("**{}**", alert.item),
        "color": GREEN,
        "fields": [
            field("Current price", format!("`{:.2}`", alert.current_price)),
            field(&alert.reference_label, format!("`{:.2}`", alert.reference_price)),
            field("Change", format!("`{:+.1}%`", alert.change_pct())),
            field("Net edge", format!("`{:+.1}%`", alert.edge_pct)),
            field("Volume 24h", format!("`{} sales`", alert.volume_24h)),
            field("Time", format!("`{}`", alert.timestamp.format("%H:%M:%S"))),
        ],
        "footer": { "text": alert.reason },
        "timestamp": alert.timestamp.to_rfc3339(),
    })
}

#[async_trait]
impl Notifier for DiscordWebhook {
    fn channel(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(&self.payload(notification))
            .send()
            .await
            .map_err(|e| Error::NotificationDeliveryFailed(format!("discord: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(Error::NotificationDeliveryFailed(format!(
                "discord returned {status}: {snippet}"
            )));
        }

        debug!(kind = notification.label(), "Discord notification delivered");
        Ok(())
    }
}
