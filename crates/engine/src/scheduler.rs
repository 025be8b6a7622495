use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use common::{ItemListing, PriceSample, Result, SessionStats, TrackerMode, Window};
use gate::AlertGate;
use notifier::{AlertMessage, Notification, Notifier};
use strategy::{window_stats, ScannerConfig, SignalEvaluator};

use crate::limiter::RateLimitedClient;
use crate::shutdown::Shutdown;
use crate::store::SignalStore;

/// Which items a cycle evaluates.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSource {
    /// Fixed list of items; each one's price is fetched individually.
    Watchlist(Vec<String>),
    /// Enumerate the market once per cycle and evaluate the filtered batch.
    MarketScan(ScanFilter),
}

impl ItemSource {
    pub fn mode(&self) -> TrackerMode {
        match self {
            ItemSource::Watchlist(_) => TrackerMode::Tracker,
            ItemSource::MarketScan(_) => TrackerMode::Scanner,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanFilter {
    pub max_item_price: f64,
    pub min_item_quantity: u32,
    /// Hard cap per cycle; keeps one cycle inside the provider quota.
    pub max_items: usize,
}

impl From<&ScannerConfig> for ScanFilter {
    fn from(cfg: &ScannerConfig) -> Self {
        Self {
            max_item_price: cfg.max_item_price,
            min_item_quantity: cfg.min_item_quantity,
            max_items: cfg.max_items_per_cycle,
        }
    }
}

impl ScanFilter {
    /// Listings worth evaluating, in provider order, capped at `max_items`.
    pub fn select(&self, listings: Vec<ItemListing>) -> Vec<ItemListing> {
        listings
            .into_iter()
            .filter(|l| {
                l.min_price.is_some_and(|p| p > 0.0 && p <= self.max_item_price)
                    && l.quantity >= self.min_item_quantity
            })
            .take(self.max_items)
            .collect()
    }
}

/// Outcome counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub items: u64,
    pub evaluated: u64,
    pub skipped: u64,
    pub signals: u64,
    pub alerts_sent: u64,
    pub alerts_suppressed: u64,
    pub interrupted: bool,
}

enum Outcome {
    NoSignal,
    Alerted,
    Suppressed,
    DeliveryFailed,
}

struct WorkItem {
    name: String,
    /// Cheapest ask and quantity already known from the market listing.
    listed: Option<PriceSample>,
}

/// Drives poll → evaluate → gate → notify, one item at a time.
pub struct Scheduler {
    client: RateLimitedClient,
    evaluator: SignalEvaluator,
    gate: AlertGate,
    notifier: Arc<dyn Notifier>,
    store: Option<SignalStore>,
    source: ItemSource,
    interval: Duration,
    startup_message: bool,
    daily_summary: bool,
    stats: SessionStats,
    /// UTC date the current counters belong to.
    day: NaiveDate,
}

impl Scheduler {
    pub fn new(
        client: RateLimitedClient,
        evaluator: SignalEvaluator,
        gate: AlertGate,
        notifier: Arc<dyn Notifier>,
        source: ItemSource,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            evaluator,
            gate,
            notifier,
            store: None,
            source,
            interval,
            startup_message: true,
            daily_summary: true,
            stats: SessionStats::new(Utc::now()),
            day: Utc::now().date_naive(),
        }
    }

    pub fn with_store(mut self, store: SignalStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_messages(mut self, startup_message: bool, daily_summary: bool) -> Self {
        self.startup_message = startup_message;
        self.daily_summary = daily_summary;
        self
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }

    /// Run cycles until shutdown is requested. Returns the counters of the
    /// current (unreported) day.
    pub async fn run(mut self, mut shutdown: Shutdown) -> SessionStats {
        let mode = self.source.mode();
        info!(mode = %mode, interval_secs = self.interval.as_secs(), "Scheduler starting");

        if self.startup_message && !shutdown.is_requested() {
            let items = match &self.source {
                ItemSource::Watchlist(items) => items.clone(),
                ItemSource::MarketScan(_) => Vec::new(),
            };
            self.send(Notification::Startup { mode, items }).await;
        }

        loop {
            if shutdown.is_requested() {
                break;
            }

            let report = self.run_cycle(&mut shutdown).await;
            if report.interrupted {
                break;
            }

            self.roll_day(Utc::now().date_naive()).await;

            debug!(sleep_secs = self.interval.as_secs(), "Sleeping until next cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.requested() => break,
            }
        }

        info!(cycles = self.stats.cycles, "Scheduler stopped");
        self.stats
    }

    /// Close the counters' day once `today` has moved past it: send the
    /// daily summary (when enabled) and start fresh counters. Returns whether
    /// the day rolled over.
    pub async fn roll_day(&mut self, today: NaiveDate) -> bool {
        if today == self.day {
            return false;
        }
        if self.daily_summary {
            self.send(Notification::DailySummary(self.stats.clone())).await;
        }
        info!(day = %self.day, cycles = self.stats.cycles, "Day closed, counters reset");
        self.stats = SessionStats::new(Utc::now());
        self.day = today;
        true
    }

    /// One pass over the current batch. Per-item failures are logged and
    /// skipped; shutdown is honoured between items.
    pub async fn run_cycle(&mut self, shutdown: &mut Shutdown) -> CycleReport {
        let mut report = CycleReport::default();

        let work = match self.source.clone() {
            ItemSource::Watchlist(items) => items
                .into_iter()
                .map(|name| WorkItem { name, listed: None })
                .collect::<Vec<_>>(),
            ItemSource::MarketScan(filter) => match self.client.list_items().await {
                Ok(listings) => {
                    let total = listings.len();
                    let batch = filter.select(listings);
                    info!(listed = total, selected = batch.len(), "Market scanned");
                    batch
                        .into_iter()
                        .map(|l| WorkItem {
                            listed: l.price_sample(),
                            name: l.name,
                        })
                        .collect()
                }
                Err(e) => {
                    warn!(error = %e, "Market listing failed, skipping cycle");
                    Vec::new()
                }
            },
        };

        info!(items = work.len(), "Cycle started");
        for item in work {
            if shutdown.is_requested() {
                report.interrupted = true;
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown.requested() => {
                    report.interrupted = true;
                    break;
                }
                _ = self.client.ready() => {}
            }

            report.items += 1;
            match self.process_item(&item).await {
                Ok(outcome) => {
                    report.evaluated += 1;
                    match outcome {
                        Outcome::NoSignal => {}
                        Outcome::Alerted => {
                            report.signals += 1;
                            report.alerts_sent += 1;
                        }
                        Outcome::Suppressed => {
                            report.signals += 1;
                            report.alerts_suppressed += 1;
                        }
                        Outcome::DeliveryFailed => report.signals += 1,
                    }
                }
                Err(e) => {
                    warn!(
                        item = %item.name,
                        provider_failure = e.is_provider_failure(),
                        error = %e,
                        "Item skipped this cycle"
                    );
                    report.skipped += 1;
                }
            }
        }

        self.stats.cycles += 1;
        self.stats.items_evaluated += report.evaluated;
        self.stats.items_skipped += report.skipped;
        self.stats.signals_detected += report.signals;
        self.stats.alerts_sent += report.alerts_sent;
        self.stats.alerts_suppressed += report.alerts_suppressed;

        info!(
            evaluated = report.evaluated,
            skipped = report.skipped,
            signals = report.signals,
            alerts = report.alerts_sent,
            "Cycle finished"
        );
        report
    }

    async fn process_item(&mut self, item: &WorkItem) -> Result<Outcome> {
        let sample = match &item.listed {
            Some(listed) => listed.clone(),
            None => self.client.current_price(&item.name).await?,
        };
        let price = sample.price;
        let history = self.client.sales_history(&item.name, Window::Days30).await?;

        let now = Utc::now();
        if let Some(store) = &self.store {
            if let Err(e) = store.record_sample(&sample).await {
                warn!(item = %item.name, error = %e, "Failed to store price sample");
            }
        }

        let stats = window_stats(&history, now);
        let Some(signal) = self.evaluator.evaluate(&item.name, price, &stats, now)? else {
            return Ok(Outcome::NoSignal);
        };

        info!(
            item = %signal.item,
            kind = %signal.kind,
            price = signal.current_price,
            reference = signal.reference_price,
            edge_pct = signal.edge_pct,
            volume_24h = signal.volume_24h,
            "Signal detected"
        );
        if let Some(store) = &self.store {
            if let Err(e) = store.record_signal(&signal).await {
                warn!(item = %signal.item, error = %e, "Failed to store signal");
            }
        }

        if !self.gate.should_notify(&signal.item, now) {
            let remaining = self.gate.remaining(&signal.item, now).map(|d| d.num_seconds());
            info!(item = %signal.item, remaining_secs = ?remaining, "Alert suppressed by cool-down");
            return Ok(Outcome::Suppressed);
        }

        let notification = Notification::Alert(AlertMessage::from(&signal));
        match self.notifier.deliver(&notification).await {
            Ok(()) => {
                self.gate.record_notified(&signal.item, Utc::now());
                if let Some(store) = &self.store {
                    if let Err(e) = store.mark_alerted(&signal.id).await {
                        warn!(item = %signal.item, error = %e, "Failed to flag signal as alerted");
                    }
                }
                info!(item = %signal.item, kind = %signal.kind, "Alert sent");
                Ok(Outcome::Alerted)
            }
            Err(e) => {
                error!(item = %signal.item, error = %e, "Alert delivery failed");
                Ok(Outcome::DeliveryFailed)
            }
        }
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notifier.deliver(&notification).await {
            warn!(kind = notification.label(), error = %e, "Notification failed");
        }
    }
}
