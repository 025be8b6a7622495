use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Per-item notification cool-down.
///
/// The gatekeeper between the signal evaluator and the notifier: a fired
/// signal is only delivered when `should_notify` allows it, and the item's
/// clock only restarts on `record_notified`, i.e. after a successful
/// delivery. Items never share state.
///
/// State lives in memory for the life of the process; a restart clears every
/// cool-down.
#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: HashMap::new(),
        }
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::minutes(minutes as i64))
    }

    /// True when `item` has never been notified or its cool-down has fully
    /// elapsed at `now`.
    pub fn should_notify(&self, item: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(item) {
            Some(&last) => now - last >= self.cooldown,
            None => true,
        }
    }

    /// Restart `item`'s cool-down at `now`.
    pub fn record_notified(&mut self, item: &str, now: DateTime<Utc>) {
        debug!(item, at = %now, "Alert recorded");
        self.last_alert.insert(item.to_string(), now);
    }

    /// Time left before `item` may alert again. `None` when it may alert now.
    pub fn remaining(&self, item: &str, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_alert.get(item)?;
        let left = self.cooldown - (now - *last);
        (left > Duration::zero()).then_some(left)
    }
}
