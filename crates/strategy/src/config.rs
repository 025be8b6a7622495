use serde::{Deserialize, Serialize};
use tracing::warn;

use common::{Error, Result};

use crate::evaluator::SignalThresholds;

/// Top-level watch file (TOML). Every section and field is optional and falls
/// back to its default.
///
/// Example `config/skinwatch.toml`:
/// ```toml
/// [signals]
/// drop_threshold_pct = 15.0
/// min_edge_pct = 5.0
/// fee_rate = 0.12
///
/// [tracker]
/// interval_minutes = 5
/// items = ["AK-47 | Redline (Field-Tested)"]
///
/// [alerts]
/// cooldown_minutes = 30
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub provider: ProviderConfig,
    pub signals: SignalThresholds,
    pub scanner: ScannerConfig,
    pub tracker: TrackerConfig,
    pub alerts: AlertsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Minimum spacing between any two provider requests.
    /// 8 requests per 300 s leaves 37.5 s per request.
    pub request_interval_secs: f64,
    /// Backoff when a 429 carries no `Retry-After`.
    pub rate_limit_fallback_secs: f64,
    pub timeout_secs: u64,
    pub currency: String,
    pub app_id: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.skinport.com/v1".to_string(),
            request_interval_secs: 37.5,
            rate_limit_fallback_secs: 60.0,
            timeout_secs: 30,
            currency: "EUR".to_string(),
            app_id: 730,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub interval_minutes: u64,
    pub max_items_per_cycle: usize,
    pub max_item_price: f64,
    pub min_item_quantity: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
            max_items_per_cycle: 10,
            max_item_price: 100.0,
            min_item_quantity: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub interval_minutes: u64,
    pub items: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            items: vec!["AK-47 | Redline (Field-Tested)".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub cooldown_minutes: u64,
    pub startup_message: bool,
    pub daily_summary: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_minutes: 30,
            startup_message: true,
            daily_summary: true,
        }
    }
}

impl WatchConfig {
    /// Load from a TOML file. A missing file yields the defaults; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &str) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse watch config at '{path}': {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path, "Watch config not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let s = &self.signals;
        if !(0.0..1.0).contains(&s.fee_rate) {
            return Err(Error::Config(format!("signals.fee_rate must be in [0, 1), got {}", s.fee_rate)));
        }
        if !(0.0..100.0).contains(&s.drop_threshold_pct) {
            return Err(Error::Config(format!(
                "signals.drop_threshold_pct must be in [0, 100), got {}",
                s.drop_threshold_pct
            )));
        }
        let p = &self.provider;
        for (name, secs) in [
            ("request_interval_secs", p.request_interval_secs),
            ("rate_limit_fallback_secs", p.rate_limit_fallback_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(Error::Config(format!(
                    "provider.{name} must be a finite, non-negative number of seconds, got {secs}"
                )));
            }
        }
        if self.scanner.max_items_per_cycle == 0 {
            return Err(Error::Config("scanner.max_items_per_cycle must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RulePriority;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = WatchConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, WatchConfig::default());
        assert_eq!(cfg.provider.request_interval_secs, 37.5);
        assert_eq!(cfg.signals.fee_rate, 0.12);
        assert_eq!(cfg.scanner.interval_minutes, 60);
        assert_eq!(cfg.tracker.interval_minutes, 5);
        assert_eq!(cfg.alerts.cooldown_minutes, 30);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = WatchConfig::from_toml_str(
            r#"
            [signals]
            min_edge_pct = 3.0
            priority = "momentum_first"

            [tracker]
            items = ["AWP | Asiimov (Field-Tested)", "M4A4 | Howl (Minimal Wear)"]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.signals.min_edge_pct, 3.0);
        assert_eq!(cfg.signals.drop_threshold_pct, 15.0);
        assert_eq!(cfg.signals.priority, RulePriority::MomentumFirst);
        assert_eq!(cfg.tracker.items.len(), 2);
        assert_eq!(cfg.tracker.interval_minutes, 5);
    }

    #[test]
    fn rejects_out_of_range_fee() {
        let err = WatchConfig::from_toml_str("[signals]\nfee_rate = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_non_finite_provider_intervals() {
        for toml in [
            "[provider]\nrequest_interval_secs = inf\n",
            "[provider]\nrequest_interval_secs = nan\n",
            "[provider]\nrate_limit_fallback_secs = -inf\n",
            "[provider]\nrate_limit_fallback_secs = -5.0\n",
        ] {
            let err = WatchConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{toml}");
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = WatchConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(cfg, WatchConfig::default());
    }
}
