use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{AggregateStats, Error, Result, SignalKind, TradingSignal};

use crate::stats::WindowStats;

/// Which rule wins when both would fire for the same evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePriority {
    #[default]
    UnderpricedFirst,
    MomentumFirst,
}

impl RulePriority {
    fn order(self) -> [SignalKind; 2] {
        match self {
            RulePriority::UnderpricedFirst => [SignalKind::Underpriced, SignalKind::Momentum],
            RulePriority::MomentumFirst => [SignalKind::Momentum, SignalKind::Underpriced],
        }
    }
}

/// Signal thresholds. Percentages are expressed in percent (`15.0` = 15%);
/// `fee_rate` is a fraction of resale proceeds (`0.12` = 12%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    pub drop_threshold_pct: f64,
    pub min_edge_pct: f64,
    pub min_volume_24h: u64,
    pub momentum_threshold_pct: f64,
    /// Stricter than `min_volume_24h`: chasing a trend needs more liquidity.
    pub momentum_min_volume_24h: u64,
    pub fee_rate: f64,
    pub priority: RulePriority,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            drop_threshold_pct: 15.0,
            min_edge_pct: 5.0,
            min_volume_24h: 5,
            momentum_threshold_pct: 8.0,
            momentum_min_volume_24h: 8,
            fee_rate: 0.12,
            priority: RulePriority::UnderpricedFirst,
        }
    }
}

/// Expected profit in percent of the purchase price after the marketplace
/// takes `fee_rate` of the resale at `reference`.
pub fn net_edge_pct(reference: f64, price: f64, fee_rate: f64) -> f64 {
    (reference * (1.0 - fee_rate) - price) / price * 100.0
}

/// Decides whether an item is underpriced or trending up.
#[derive(Debug, Clone, Default)]
pub struct SignalEvaluator {
    thresholds: SignalThresholds,
}

impl SignalEvaluator {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate both rules in priority order. At most one signal is returned.
    ///
    /// A rule whose windows are missing is skipped. A non-positive price or
    /// statistic makes the whole item non-evaluable and yields `InvalidInput`.
    pub fn evaluate(
        &self,
        item: &str,
        current_price: f64,
        stats: &WindowStats,
        now: DateTime<Utc>,
    ) -> Result<Option<TradingSignal>> {
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(Error::InvalidInput(format!(
                "{item}: current price must be positive, got {current_price}"
            )));
        }
        for s in [stats.h24, stats.d7, stats.d30].iter().flatten() {
            if !is_positive(s.median) || !is_positive(s.mean) {
                return Err(Error::InvalidInput(format!(
                    "{item}: non-positive {} statistic (median {}, mean {})",
                    s.window, s.median, s.mean
                )));
            }
        }

        for kind in self.thresholds.priority.order() {
            let signal = match kind {
                SignalKind::Underpriced => self.underpriced(item, current_price, stats, now),
                SignalKind::Momentum => self.momentum(item, current_price, stats, now),
            };
            if signal.is_some() {
                return Ok(signal);
            }
        }

        debug!(item, price = current_price, "No signal");
        Ok(None)
    }

    fn underpriced(
        &self,
        item: &str,
        price: f64,
        stats: &WindowStats,
        now: DateTime<Utc>,
    ) -> Option<TradingSignal> {
        let t = &self.thresholds;
        let (h24, d7) = (stats.h24?, stats.d7?);

        let ceiling = d7.median * (1.0 - t.drop_threshold_pct / 100.0);
        if price > ceiling {
            return None;
        }
        let edge = net_edge_pct(d7.median, price, t.fee_rate);
        if edge < t.min_edge_pct || h24.volume < t.min_volume_24h {
            return None;
        }

        Some(build_signal(item, SignalKind::Underpriced, price, &d7, d7.median, edge, h24.volume, now))
    }

    fn momentum(
        &self,
        item: &str,
        price: f64,
        stats: &WindowStats,
        now: DateTime<Utc>,
    ) -> Option<TradingSignal> {
        let t = &self.thresholds;
        let (h24, d7) = (stats.h24?, stats.d7?);

        if h24.mean <= d7.mean {
            return None;
        }
        let rise = (h24.mean - d7.mean) / d7.mean * 100.0;
        if rise < t.momentum_threshold_pct || h24.volume < t.momentum_min_volume_24h {
            return None;
        }

        Some(build_signal(item, SignalKind::Momentum, price, &d7, d7.mean, rise, h24.volume, now))
    }
}

#[allow(clippy::too_many_arguments)]
fn build_signal(
    item: &str,
    kind: SignalKind,
    price: f64,
    reference_window: &AggregateStats,
    reference: f64,
    edge_pct: f64,
    volume_24h: u64,
    now: DateTime<Utc>,
) -> TradingSignal {
    debug!(item, kind = %kind, window = %reference_window.window, reference, "Rule matched");
    TradingSignal {
        id: uuid::Uuid::new_v4().to_string(),
        item: item.to_string(),
        kind,
        current_price: price,
        reference_price: reference,
        drop_pct: (reference - price) / reference * 100.0,
        edge_pct,
        volume_24h,
        timestamp: now,
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Window;

    fn stats(window: Window, median: f64, mean: f64, volume: u64) -> Option<AggregateStats> {
        Some(AggregateStats {
            window,
            median,
            mean,
            volume,
        })
    }

    fn window_stats(h24: (f64, f64, u64), d7: (f64, f64, u64)) -> WindowStats {
        WindowStats {
            h24: stats(Window::Hours24, h24.0, h24.1, h24.2),
            d7: stats(Window::Days7, d7.0, d7.1, d7.2),
            d30: stats(Window::Days30, d7.0, d7.1, d7.2 * 4),
        }
    }

    #[test]
    fn underpriced_fires_with_exact_edge() {
        let evaluator = SignalEvaluator::default();
        let ws = window_stats((8.0, 8.0, 42), (9.0, 9.0, 200));

        let signal = evaluator
            .evaluate("AK-47 | Redline (Field-Tested)", 7.50, &ws, Utc::now())
            .unwrap()
            .expect("underpriced should fire");

        assert_eq!(signal.kind, SignalKind::Underpriced);
        let expected = (9.00 * 0.88 - 7.50) / 7.50 * 100.0;
        assert!((signal.edge_pct - expected).abs() < 1e-9);
        assert!((signal.edge_pct - 5.6).abs() < 1e-9);
        assert_eq!(signal.reference_price, 9.0);
        assert_eq!(signal.volume_24h, 42);
    }

    #[test]
    fn momentum_fires_on_rising_average() {
        let evaluator = SignalEvaluator::new(SignalThresholds {
            momentum_min_volume_24h: 7,
            ..SignalThresholds::default()
        });
        let ws = window_stats((10.0, 10.0, 8), (9.0, 9.0, 60));

        let signal = evaluator
            .evaluate("AWP | Asiimov (Field-Tested)", 10.0, &ws, Utc::now())
            .unwrap()
            .expect("momentum should fire");

        assert_eq!(signal.kind, SignalKind::Momentum);
        assert!((signal.edge_pct - 100.0 / 9.0).abs() < 1e-9);
        assert_eq!(signal.reference_price, 9.0);
    }

    #[test]
    fn momentum_needs_its_own_volume_floor() {
        let evaluator = SignalEvaluator::default();
        let ws = window_stats((10.0, 10.0, 7), (9.0, 9.0, 60));
        assert!(evaluator.evaluate("x", 10.0, &ws, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn underpriced_wins_tie_by_default() {
        let ws = window_stats((8.0, 12.0, 50), (10.0, 10.0, 200));

        let default = SignalEvaluator::default();
        let signal = default.evaluate("x", 7.0, &ws, Utc::now()).unwrap().unwrap();
        assert_eq!(signal.kind, SignalKind::Underpriced);

        let momentum_first = SignalEvaluator::new(SignalThresholds {
            priority: RulePriority::MomentumFirst,
            ..SignalThresholds::default()
        });
        let signal = momentum_first.evaluate("x", 7.0, &ws, Utc::now()).unwrap().unwrap();
        assert_eq!(signal.kind, SignalKind::Momentum);
    }

    #[test]
    fn missing_window_skips_rule() {
        let evaluator = SignalEvaluator::default();
        let ws = WindowStats {
            h24: None,
            ..window_stats((8.0, 8.0, 42), (9.0, 9.0, 200))
        };
        assert!(evaluator.evaluate("x", 7.5, &ws, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn non_positive_inputs_are_invalid() {
        let evaluator = SignalEvaluator::default();
        let ws = window_stats((8.0, 8.0, 42), (9.0, 9.0, 200));

        assert!(matches!(
            evaluator.evaluate("x", 0.0, &ws, Utc::now()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            evaluator.evaluate("x", -1.0, &ws, Utc::now()),
            Err(Error::InvalidInput(_))
        ));

        let bad = window_stats((8.0, 8.0, 42), (0.0, 9.0, 200));
        assert!(matches!(
            evaluator.evaluate("x", 7.5, &bad, Utc::now()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn net_edge_formula() {
        assert!((net_edge_pct(100.0, 50.0, 0.12) - 76.0).abs() < 1e-9);
        assert!(net_edge_pct(9.0, 8.0, 0.12) < 0.0);
    }
}
