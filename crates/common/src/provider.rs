use async_trait::async_trait;

use crate::{ItemListing, PriceSample, Result, SalesHistory, Window};

/// Abstraction over the price-data source.
///
/// `SkinportClient` implements this for live polling.
/// `ReplayProvider` implements this for offline runs and tests.
///
/// Nothing above the engine talks to a provider directly: every call goes
/// through `RateLimitedClient`, which owns pacing and 429 handling.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Latest observed price for one item.
    async fn current_price(&self, item: &str) -> Result<PriceSample>;

    /// Sales history covering at least `window` back from now.
    async fn sales_history(&self, item: &str, window: Window) -> Result<SalesHistory>;

    /// Every item currently listed on the market. Used by the scanner.
    async fn list_items(&self) -> Result<Vec<ItemListing>>;
}
