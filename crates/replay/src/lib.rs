use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ItemListing, PriceProvider, PriceSample, Result, SalesHistory, Window};

/// Offline price provider for dry runs and tests.
///
/// Serves listings and sales from an in-memory book. No request ever leaves
/// the process.
#[derive(Default)]
pub struct ReplayProvider {
    /// Latest listing per item, updated via `update_price`.
    listings: Arc<RwLock<HashMap<String, ItemListing>>>,
    /// Sale records per item, oldest first.
    sales: Arc<RwLock<HashMap<String, Vec<PriceSample>>>>,
    requests: AtomicU64,
}

/// On-disk fixture. Sale times are offsets from the moment the fixture is
/// loaded, so a fixture never goes stale.
///
/// ```json
/// {
///   "items": [{ "market_hash_name": "AK-47 | Redline (Field-Tested)", "min_price": 7.5, "quantity": 40 }],
///   "sales": [{ "market_hash_name": "AK-47 | Redline (Field-Tested)", "price": 9.1, "volume": 1, "hours_ago": 30 }]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub items: Vec<FixtureItem>,
    #[serde(default)]
    pub sales: Vec<FixtureSale>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureItem {
    pub market_hash_name: String,
    pub min_price: Option<f64>,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSale {
    pub market_hash_name: String,
    pub price: f64,
    #[serde(default = "one")]
    pub volume: u32,
    pub hours_ago: f64,
}

fn one() -> u32 {
    1
}

impl ReplayProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from a fixture, anchoring sale offsets at `anchor`.
    pub fn from_fixture(fixture: Fixture, anchor: DateTime<Utc>) -> Self {
        let mut listings = HashMap::new();
        for item in fixture.items {
            listings.insert(
                item.market_hash_name.clone(),
                ItemListing {
                    name: item.market_hash_name,
                    min_price: item.min_price,
                    quantity: item.quantity,
                    timestamp: anchor,
                },
            );
        }

        let mut sales: HashMap<String, Vec<PriceSample>> = HashMap::new();
        for sale in fixture.sales {
            let at = anchor - Duration::seconds((sale.hours_ago * 3600.0) as i64);
            sales
                .entry(sale.market_hash_name.clone())
                .or_default()
                .push(PriceSample::new(sale.market_hash_name, sale.price, sale.volume, at));
        }
        for book in sales.values_mut() {
            book.sort_by_key(|s| s.timestamp);
        }

        info!(items = listings.len(), sale_items = sales.len(), "ReplayProvider initialized");
        Self {
            listings: Arc::new(RwLock::new(listings)),
            sales: Arc::new(RwLock::new(sales)),
            requests: AtomicU64::new(0),
        }
    }

    /// Load a JSON fixture from disk, anchored at the current time.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        Ok(Self::from_fixture(fixture, Utc::now()))
    }

    /// Set the cheapest ask for an item, creating the listing if needed.
    pub async fn update_price(&self, item: &str, price: Option<f64>, quantity: u32) {
        self.listings.write().await.insert(
            item.to_string(),
            ItemListing {
                name: item.to_string(),
                min_price: price,
                quantity,
                timestamp: Utc::now(),
            },
        );
    }

    /// Append a sale record to an item's history.
    pub async fn record_sale(&self, item: &str, price: f64, volume: u32, at: DateTime<Utc>) {
        let mut sales = self.sales.write().await;
        let book = sales.entry(item.to_string()).or_default();
        book.push(PriceSample::new(item, price, volume, at));
        book.sort_by_key(|s| s.timestamp);
    }

    /// Number of provider calls served so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn count(&self, op: &str, item: &str) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!(op, item, "Replay request served");
    }
}

#[async_trait]
impl PriceProvider for ReplayProvider {
    async fn current_price(&self, item: &str) -> Result<PriceSample> {
        self.count("current_price", item);
        let listings = self.listings.read().await;
        let listing = listings
            .get(item)
            .ok_or_else(|| Error::UnknownItem(item.to_string()))?;
        listing
            .price_sample()
            .ok_or_else(|| Error::InvalidInput(format!("{item} has no active listing")))
    }

    async fn sales_history(&self, item: &str, window: Window) -> Result<SalesHistory> {
        self.count("sales_history", item);
        let known = self.listings.read().await.contains_key(item);
        let sales = self.sales.read().await;
        let book = match sales.get(item) {
            Some(book) => book,
            None if known => {
                return Ok(SalesHistory {
                    item: item.to_string(),
                    ..SalesHistory::default()
                })
            }
            None => return Err(Error::UnknownItem(item.to_string())),
        };

        let cutoff = Utc::now() - Duration::seconds(window.duration().as_secs() as i64);
        Ok(SalesHistory {
            item: item.to_string(),
            sales: book.iter().filter(|s| s.timestamp > cutoff).cloned().collect(),
            summaries: Vec::new(),
        })
    }

    async fn list_items(&self) -> Result<Vec<ItemListing>> {
        self.count("list_items", "*");
        let mut items: Vec<ItemListing> = self.listings.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}
