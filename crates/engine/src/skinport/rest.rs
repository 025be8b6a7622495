use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use common::{
    Error, ItemListing, PriceProvider, PriceSample, Result, SalesHistory, Window, WindowSummary,
};
use strategy::ProviderConfig;

/// REST client for the Skinport public API.
///
/// Makes exactly one HTTP request per call and never retries; pacing and
/// 429 backoff belong to `RateLimitedClient`.
pub struct SkinportClient {
    client_id: String,
    client_secret: String,
    base_url: String,
    app_id: u32,
    currency: String,
    http: Client,
}

impl SkinportClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        cfg: &ProviderConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            app_id: cfg.app_id,
            currency: cfg.currency.clone(),
            http,
        })
    }

    /// Point the client at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "Skinport request");

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let resp = check_status(resp).await?;
        let body = resp.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| Error::MalformedResponse(format!("{path}: {e}")))
    }

    async fn items(&self) -> Result<Vec<ItemEntry>> {
        self.get(
            "/items",
            &[
                ("app_id", self.app_id.to_string()),
                ("currency", self.currency.clone()),
            ],
        )
        .await
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(Error::RateLimited { retry_after });
    }

    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::Auth(format!("HTTP {status}: {snippet}")))
        }
        _ => Err(Error::Http(format!("HTTP {status}: {snippet}"))),
    }
}

#[async_trait]
impl PriceProvider for SkinportClient {
    async fn current_price(&self, item: &str) -> Result<PriceSample> {
        let entry = self
            .items()
            .await?
            .into_iter()
            .find(|e| e.market_hash_name == item)
            .ok_or_else(|| Error::UnknownItem(item.to_string()))?;

        let price = entry
            .min_price
            .ok_or_else(|| Error::InvalidInput(format!("{item} has no active listing")))?;
        Ok(PriceSample::new(item, price, entry.quantity.unwrap_or(0), Utc::now()))
    }

    async fn sales_history(&self, item: &str, window: Window) -> Result<SalesHistory> {
        debug!(item, window = %window, "Fetching sales history");
        let entries: Vec<HistoryEntry> = self
            .get(
                "/sales/history",
                &[
                    ("app_id", self.app_id.to_string()),
                    ("currency", self.currency.clone()),
                    ("market_hash_name", item.to_string()),
                ],
            )
            .await?;

        let entry = entries
            .into_iter()
            .find(|e| e.market_hash_name == item)
            .ok_or_else(|| Error::UnknownItem(item.to_string()))?;

        let summaries = [
            (Window::Hours24, entry.last_24_hours),
            (Window::Days7, entry.last_7_days),
            (Window::Days30, entry.last_30_days),
        ]
        .into_iter()
        .filter(|(w, _)| *w <= window)
        .filter_map(|(w, s)| s.map(|s| s.into_summary(w)))
        .collect();

        Ok(SalesHistory {
            item: item.to_string(),
            sales: Vec::new(),
            summaries,
        })
    }

    async fn list_items(&self) -> Result<Vec<ItemListing>> {
        let now = Utc::now();
        Ok(self
            .items()
            .await?
            .into_iter()
            .map(|e| ItemListing {
                name: e.market_hash_name,
                min_price: e.min_price,
                quantity: e.quantity.unwrap_or(0),
                timestamp: now,
            })
            .collect())
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ItemEntry {
    market_hash_name: String,
    min_price: Option<f64>,
    quantity: Option<u32>,
}

#[derive(Deserialize)]
struct HistoryEntry {
    market_hash_name: String,
    last_24_hours: Option<HistoryWindow>,
    last_7_days: Option<HistoryWindow>,
    last_30_days: Option<HistoryWindow>,
}

#[derive(Deserialize)]
struct HistoryWindow {
    avg: Option<f64>,
    median: Option<f64>,
    #[serde(default)]
    volume: Option<u64>,
}

impl HistoryWindow {
    fn into_summary(self, window: Window) -> WindowSummary {
        WindowSummary {
            window,
            median: self.median,
            mean: self.avg,
            volume: self.volume.unwrap_or(0),
        }
    }
}
