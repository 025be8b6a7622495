use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolling statistics window. Ordered from shortest to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "7d")]
    Days7,
    #[serde(rename = "30d")]
    Days30,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::Hours24, Window::Days7, Window::Days30];

    pub fn duration(&self) -> Duration {
        const HOUR: u64 = 60 * 60;
        match self {
            Window::Hours24 => Duration::from_secs(24 * HOUR),
            Window::Days7 => Duration::from_secs(7 * 24 * HOUR),
            Window::Days30 => Duration::from_secs(30 * 24 * HOUR),
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Window::Hours24 => write!(f, "24h"),
            Window::Days7 => write!(f, "7d"),
            Window::Days30 => write!(f, "30d"),
        }
    }
}

/// One observed price point for an item. A single sale carries `volume == 1`;
/// provider ticks may bundle several sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub item: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: u32,
}

impl PriceSample {
    pub fn new(item: impl Into<String>, price: f64, volume: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            item: item.into(),
            timestamp,
            price,
            volume,
        }
    }
}

/// An item currently listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemListing {
    pub name: String,
    /// Cheapest ask. `None` when nothing is listed right now.
    pub min_price: Option<f64>,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
}

impl ItemListing {
    /// Current-price sample derived from the cheapest ask, if any.
    pub fn price_sample(&self) -> Option<PriceSample> {
        self.min_price
            .map(|price| PriceSample::new(self.name.clone(), price, self.quantity, self.timestamp))
    }
}

/// Window aggregate computed by the provider itself.
/// Fields are optional because providers report `null` for empty windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window: Window,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub volume: u64,
}

/// Everything the provider knows about an item's recent sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesHistory {
    pub item: String,
    /// Raw sale records, oldest first when the provider exposes them.
    pub sales: Vec<PriceSample>,
    /// Pre-aggregated windows when the provider only exposes aggregates.
    pub summaries: Vec<WindowSummary>,
}

impl SalesHistory {
    pub fn summary(&self, window: Window) -> Option<&WindowSummary> {
        self.summaries.iter().find(|s| s.window == window)
    }
}

/// Statistics for one window. Only ever built from a non-empty sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub window: Window,
    pub median: f64,
    pub mean: f64,
    pub volume: u64,
}

impl AggregateStats {
    /// Validate a provider summary. An empty window or a window with `null`
    /// statistics has no opinion.
    pub fn from_summary(summary: &WindowSummary) -> crate::Result<Self> {
        match (summary.median, summary.mean) {
            (Some(median), Some(mean)) if summary.volume > 0 => Ok(Self {
                window: summary.window,
                median,
                mean,
                volume: summary.volume,
            }),
            _ => Err(crate::Error::InsufficientData {
                window: summary.window,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum SignalKind {
    Underpriced,
    Momentum,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Underpriced => write!(f, "UNDERPRICED"),
            SignalKind::Momentum => write!(f, "MOMENTUM"),
        }
    }
}

/// A fired signal. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: String,
    pub item: String,
    pub kind: SignalKind,
    pub current_price: f64,
    /// 7d median for UNDERPRICED, 7d mean for MOMENTUM.
    pub reference_price: f64,
    /// How far the current price sits below the reference, in percent.
    pub drop_pct: f64,
    /// Net resale edge for UNDERPRICED; 24h-over-7d mean rise for MOMENTUM.
    pub edge_pct: f64,
    pub volume_24h: u64,
    pub timestamp: DateTime<Utc>,
}

impl TradingSignal {
    pub fn reason(&self) -> String {
        match self.kind {
            SignalKind::Underpriced => format!(
                "Price {:.1}% below 7d median, net edge {:.1}%",
                self.drop_pct, self.edge_pct
            ),
            SignalKind::Momentum => format!(
                "24h average {:+.1}% over 7d average on {} sales",
                self.edge_pct, self.volume_24h
            ),
        }
    }
}

/// Deployment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerMode {
    /// Single item (or short watch-list), tight polling.
    Tracker,
    /// Enumerated market batch, capped per cycle.
    Scanner,
}

impl std::fmt::Display for TrackerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerMode::Tracker => write!(f, "tracker"),
            TrackerMode::Scanner => write!(f, "scanner"),
        }
    }
}

/// Where price data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Replay,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Live => write!(f, "live"),
            DataSource::Replay => write!(f, "replay"),
        }
    }
}

/// Counters reported in the daily summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub cycles: u64,
    pub items_evaluated: u64,
    pub items_skipped: u64,
    pub signals_detected: u64,
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    pub since: DateTime<Utc>,
}

impl SessionStats {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self {
            cycles: 0,
            items_evaluated: 0,
            items_skipped: 0,
            signals_detected: 0,
            alerts_sent: 0,
            alerts_suppressed: 0,
            since,
        }
    }
}
