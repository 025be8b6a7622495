pub mod config;
pub mod evaluator;
pub mod stats;

pub use config::{AlertsConfig, ProviderConfig, ScannerConfig, TrackerConfig, WatchConfig};
pub use evaluator::{net_edge_pct, RulePriority, SignalEvaluator, SignalThresholds};
pub use stats::{aggregate, window_stats, WindowStats};
