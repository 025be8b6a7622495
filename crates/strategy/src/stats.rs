use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use common::{AggregateStats, Error, PriceSample, Result, SalesHistory, Window};

/// Compute median, mean and volume for the samples inside
/// `(as_of - window, as_of]`.
///
/// The median is the sorted midpoint; even counts average the two central
/// prices. Every sample counts once toward median and mean regardless of its
/// volume, and volume is the sum of sample volumes.
///
/// Returns `InsufficientData` when no sample falls inside the window. Callers
/// treat that as "no opinion", not as a failure.
pub fn aggregate(samples: &[PriceSample], window: Window, as_of: DateTime<Utc>) -> Result<AggregateStats> {
    let start = as_of - Duration::seconds(window.duration().as_secs() as i64);

    let in_window: Vec<&PriceSample> = samples
        .iter()
        .filter(|s| s.timestamp > start && s.timestamp <= as_of)
        .collect();

    if in_window.is_empty() {
        return Err(Error::InsufficientData { window });
    }

    let mut prices: Vec<f64> = in_window.iter().map(|s| s.price).collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let n = prices.len();
    let median = if n % 2 == 1 {
        prices[n / 2]
    } else {
        (prices[n / 2 - 1] + prices[n / 2]) / 2.0
    };
    let mean = prices.iter().sum::<f64>() / n as f64;
    let volume = in_window.iter().map(|s| u64::from(s.volume)).sum();

    Ok(AggregateStats {
        window,
        median,
        mean,
        volume,
    })
}

/// Per-window statistics for one item. A `None` window had no samples and
/// disqualifies every rule that references it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub h24: Option<AggregateStats>,
    pub d7: Option<AggregateStats>,
    pub d30: Option<AggregateStats>,
}

impl WindowStats {
    pub fn get(&self, window: Window) -> Option<&AggregateStats> {
        match window {
            Window::Hours24 => self.h24.as_ref(),
            Window::Days7 => self.d7.as_ref(),
            Window::Days30 => self.d30.as_ref(),
        }
    }

    fn set(&mut self, stats: AggregateStats) {
        match stats.window {
            Window::Hours24 => self.h24 = Some(stats),
            Window::Days7 => self.d7 = Some(stats),
            Window::Days30 => self.d30 = Some(stats),
        }
    }
}

/// Build statistics for every window from a provider history.
///
/// A provider summary for the window wins over raw sales; without one the raw
/// sales are aggregated. Windows without data are left empty.
pub fn window_stats(history: &SalesHistory, as_of: DateTime<Utc>) -> WindowStats {
    let mut stats = WindowStats::default();

    for window in Window::ALL {
        let computed = match history.summary(window) {
            Some(summary) => AggregateStats::from_summary(summary),
            None => aggregate(&history.sales, window, as_of),
        };

        match computed {
            Ok(s) => stats.set(s),
            Err(e) => debug!(item = %history.item, window = %window, error = %e, "Window not evaluable"),
        }
    }

    stats
}
