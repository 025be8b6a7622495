use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

use common::{Error, ItemListing, PriceProvider, PriceSample, Result, SalesHistory, Window};
use strategy::ProviderConfig;

/// Request pacing for one provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    /// Minimum spacing between the starts of two requests, across all
    /// endpoints.
    pub min_interval: Duration,
    /// Backoff when a rate-limit answer carries no retry delay.
    pub fallback_backoff: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(37_500),
            fallback_backoff: Duration::from_secs(60),
        }
    }
}

impl TryFrom<&ProviderConfig> for RateLimitPolicy {
    type Error = Error;

    fn try_from(cfg: &ProviderConfig) -> Result<Self> {
        let secs = |name: &str, value: f64| {
            Duration::try_from_secs_f64(value)
                .map_err(|e| Error::Config(format!("provider.{name} = {value}: {e}")))
        };
        Ok(Self {
            min_interval: secs("request_interval_secs", cfg.request_interval_secs)?,
            fallback_backoff: secs("rate_limit_fallback_secs", cfg.rate_limit_fallback_secs)?,
        })
    }
}

/// Wraps a `PriceProvider` with a single process-wide request budget.
///
/// Every call waits until `min_interval` has passed since the previous
/// request started. A rate-limit answer is retried exactly once after the
/// signaled delay; a second one surfaces as `ProviderUnavailable`. Every
/// other error surfaces immediately.
pub struct RateLimitedClient {
    provider: Arc<dyn PriceProvider>,
    policy: RateLimitPolicy,
    /// Start time of the most recent request. `None` until the first one.
    last_request: Mutex<Option<Instant>>,
}

impl RateLimitedClient {
    pub fn new(provider: Arc<dyn PriceProvider>, policy: RateLimitPolicy) -> Self {
        Self {
            provider,
            policy,
            last_request: Mutex::new(None),
        }
    }

    /// Resolves once a request could start without waiting. Does not claim
    /// the slot; the scheduler races this against shutdown between items.
    pub async fn ready(&self) {
        let next = self
            .last_request
            .lock()
            .await
            .map(|last| last + self.policy.min_interval);
        if let Some(next) = next {
            sleep_until(next).await;
        }
    }

    pub async fn current_price(&self, item: &str) -> Result<PriceSample> {
        let provider = &self.provider;
        self.call("current_price", item, move || provider.current_price(item))
            .await
    }

    pub async fn sales_history(&self, item: &str, window: Window) -> Result<SalesHistory> {
        let provider = &self.provider;
        self.call("sales_history", item, move || provider.sales_history(item, window))
            .await
    }

    pub async fn list_items(&self) -> Result<Vec<ItemListing>> {
        let provider = &self.provider;
        self.call("list_items", "*", move || provider.list_items()).await
    }

    /// Wait for the pacing slot and claim it. The lock is held across the
    /// wait so concurrent callers queue up one interval apart.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.policy.min_interval;
            let now = Instant::now();
            if next > now {
                debug!(wait_ms = (next - now).as_millis() as u64, "Pacing provider request");
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn call<T, F, Fut>(&self, op: &'static str, item: &str, request: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.pace().await;
        let retry_after = match request().await {
            Err(Error::RateLimited { retry_after }) => retry_after,
            other => return other,
        };

        let wait = retry_after.unwrap_or(self.policy.fallback_backoff);
        warn!(op, item, wait_secs = wait.as_secs_f64(), "Rate limited by provider, backing off");
        sleep(wait).await;

        self.pace().await;
        match request().await {
            Err(Error::RateLimited { .. }) => Err(Error::ProviderUnavailable(format!(
                "{op} for '{item}': still rate limited after one retry"
            ))),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;

    /// Provider that replays scripted answers and records call times.
    #[derive(Default)]
    struct Scripted {
        answers: StdMutex<VecDeque<Result<PriceSample>>>,
        calls: StdMutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<PriceSample>>) -> Arc<Self> {
            Arc::new(Self {
                answers: StdMutex::new(answers.into()),
                calls: StdMutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn sample(price: f64) -> Result<PriceSample> {
        Ok(PriceSample::new("item", price, 1, Utc::now()))
    }

    #[async_trait]
    impl PriceProvider for Scripted {
        async fn current_price(&self, _item: &str) -> Result<PriceSample> {
            self.calls.lock().unwrap().push(Instant::now());
            self.answers.lock().unwrap().pop_front().unwrap_or_else(|| sample(1.0))
        }

        async fn sales_history(&self, item: &str, _window: Window) -> Result<SalesHistory> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok(SalesHistory {
                item: item.to_string(),
                ..SalesHistory::default()
            })
        }

        async fn list_items(&self) -> Result<Vec<ItemListing>> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_full_interval() {
        let provider = Scripted::new(vec![]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        client.current_price("item").await.unwrap();
        client.sales_history("item", Window::Days7).await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= Duration::from_millis(37_500));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_shared_across_endpoints() {
        let provider = Scripted::new(vec![]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        client.list_items().await.unwrap();
        client.current_price("a").await.unwrap();
        client.sales_history("a", Window::Hours24).await.unwrap();

        let calls = provider.calls();
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(37_500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried_once_after_signaled_delay() {
        let provider = Scripted::new(vec![
            Err(Error::RateLimited {
                retry_after: Some(Duration::from_secs(90)),
            }),
            sample(7.5),
        ]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        let price = client.current_price("item").await.unwrap();
        assert_eq!(price.price, 7.5);

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_without_delay_uses_fallback() {
        let provider = Scripted::new(vec![Err(Error::RateLimited { retry_after: None }), sample(3.0)]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        client.current_price("item").await.unwrap();
        let calls = provider.calls();
        assert!(calls[1] - calls[0] >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn short_retry_delay_still_respects_interval() {
        let provider = Scripted::new(vec![
            Err(Error::RateLimited {
                retry_after: Some(Duration::from_secs(1)),
            }),
            sample(3.0),
        ]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        client.current_price("item").await.unwrap();
        let calls = provider.calls();
        assert!(calls[1] - calls[0] >= Duration::from_millis(37_500));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_rate_limit_becomes_provider_unavailable() {
        let provider = Scripted::new(vec![
            Err(Error::RateLimited { retry_after: None }),
            Err(Error::RateLimited { retry_after: None }),
            sample(1.0),
        ]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        let err = client.current_price("item").await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnavailable(_)));
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_not_retried() {
        let provider = Scripted::new(vec![Err(Error::Auth("bad credentials".into())), sample(1.0)]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        let err = client.current_price("item").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_waits_without_claiming() {
        let provider = Scripted::new(vec![]);
        let client = RateLimitedClient::new(provider.clone(), RateLimitPolicy::default());

        let start = Instant::now();
        client.ready().await;
        assert_eq!(Instant::now(), start);

        client.current_price("item").await.unwrap();
        client.ready().await;
        assert!(Instant::now() - start >= Duration::from_millis(37_500));

        // ready() left the slot free: the next call starts right away.
        let before = Instant::now();
        client.current_price("item").await.unwrap();
        assert_eq!(provider.calls()[1], before);
    }

    #[test]
    fn policy_from_config() {
        let policy = RateLimitPolicy::try_from(&ProviderConfig::default()).unwrap();
        assert_eq!(policy, RateLimitPolicy::default());
    }

    #[test]
    fn non_finite_interval_is_config_error() {
        for bad in [f64::INFINITY, f64::NAN, -1.0] {
            let cfg = ProviderConfig {
                request_interval_secs: bad,
                ..ProviderConfig::default()
            };
            assert!(matches!(RateLimitPolicy::try_from(&cfg), Err(Error::Config(_))));
        }
    }
}
