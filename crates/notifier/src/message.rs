use chrono::{DateTime, Utc};

use common::{SessionStats, SignalKind, TrackerMode, TradingSignal};

/// Everything a channel needs to render one opportunity.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub title: String,
    pub item: String,
    pub kind: SignalKind,
    pub current_price: f64,
    /// Human label of the reference statistic, e.g. "7d median".
    pub reference_label: String,
    pub reference_price: f64,
    pub drop_pct: f64,
    pub edge_pct: f64,
    pub volume_24h: u64,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl AlertMessage {
    /// Signed move of the current price against the reference, in percent.
    /// Negative below the reference, positive above it.
    pub fn change_pct(&self) -> f64 {
        -self.drop_pct
    }
}

impl From<&TradingSignal> for AlertMessage {
    fn from(signal: &TradingSignal) -> Self {
        let (title, reference_label) = match signal.kind {
            SignalKind::Underpriced => ("Opportunity detected: underpriced", "7d median"),
            SignalKind::Momentum => ("Opportunity detected: momentum", "7d mean"),
        };
        Self {
            title: title.to_string(),
            item: signal.item.clone(),
            kind: signal.kind,
            current_price: signal.current_price,
            reference_label: reference_label.to_string(),
            reference_price: signal.reference_price,
            drop_pct: signal.drop_pct,
            edge_pct: signal.edge_pct,
            volume_24h: signal.volume_24h,
            timestamp: signal.timestamp,
            reason: signal.reason(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Alert(AlertMessage),
    /// Sent once when the scheduler starts. `items` is empty for a market scan.
    Startup { mode: TrackerMode, items: Vec<String> },
    DailySummary(SessionStats),
}

impl Notification {
    /// One-line kind label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Notification::Alert(_) => "alert",
            Notification::Startup { .. } => "startup",
            Notification::DailySummary(_) => "daily_summary",
        }
    }

    /// Plain-text rendering shared by the text channels.
    pub fn render_text(&self) -> String {
        match self {
            Notification::Alert(a) => format!(
                "{title}\n\
                 {item}\n\
                 Price: {price:.2}\n\
                 {label}: {reference:.2}\n\
                 Change vs {label}: {change:+.1}%\n\
                 Net edge: {edge:+.1}%\n\
                 Volume 24h: {volume} sales\n\
                 Time: {time}\n\
                 {reason}",
                title = a.title,
                item = a.item,
                price = a.current_price,
                label = a.reference_label,
                reference = a.reference_price,
                change = a.change_pct(),
                edge = a.edge_pct,
                volume = a.volume_24h,
                time = a.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                reason = a.reason,
            ),
            Notification::Startup { mode, items } if items.is_empty() => {
                format!("Skinwatch started ({mode}): scanning the market")
            }
            Notification::Startup { mode, items } => {
                format!("Skinwatch started ({mode}): watching {}", items.join(", "))
            }
            Notification::DailySummary(s) => format!(
                "Daily summary since {since}\n\
                 Cycles: {cycles}\n\
                 Items evaluated: {evaluated} ({skipped} skipped)\n\
                 Signals detected: {signals}\n\
                 Alerts sent: {sent} ({suppressed} suppressed)",
                since = s.since.format("%Y-%m-%d %H:%M UTC"),
                cycles = s.cycles,
                evaluated = s.items_evaluated,
                skipped = s.items_skipped,
                signals = s.signals_detected,
                sent = s.alerts_sent,
                suppressed = s.alerts_suppressed,
            ),
        }
    }
}
