use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, DataSource, PriceProvider, TrackerMode};
use engine::{
    shutdown, ItemSource, RateLimitPolicy, RateLimitedClient, ScanFilter, Scheduler, SignalStore,
    SkinportClient,
};
use gate::AlertGate;
use notifier::{Dispatcher, DiscordWebhook, LogNotifier, Notifier, TelegramNotifier};
use replay::ReplayProvider;
use strategy::{SignalEvaluator, WatchConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ───────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Invalid environment configuration")?;
    let watch = WatchConfig::load(&cfg.watch_config_path).context("Invalid watch config")?;
    info!(mode = %cfg.mode, source = %cfg.data_source, "Skinwatch starting");

    // ── Audit store (optional) ───────────────────────────────────────────────
    let store = match &cfg.database_url {
        Some(url) => Some(
            SignalStore::connect(url)
                .await
                .with_context(|| format!("Failed to open database at '{url}'"))?,
        ),
        None => {
            info!("DATABASE_URL not set, audit store disabled");
            None
        }
    };

    // ── Price provider (injected based on DATA_SOURCE) ───────────────────────
    let provider: Arc<dyn PriceProvider> = match cfg.data_source {
        DataSource::Live => {
            let (Some(id), Some(secret)) = (&cfg.skinport_client_id, &cfg.skinport_client_secret)
            else {
                anyhow::bail!("Skinport credentials missing");
            };
            info!(base_url = %watch.provider.base_url, "Live data source, using SkinportClient");
            Arc::new(SkinportClient::new(id, secret, &watch.provider)?)
        }
        DataSource::Replay => {
            let path = cfg
                .replay_fixture_path
                .as_deref()
                .context("REPLAY_FIXTURE_PATH missing")?;
            info!(path, "Replay data source, using ReplayProvider");
            Arc::new(ReplayProvider::load(path).with_context(|| format!("Failed to load fixture '{path}'"))?)
        }
    };
    let policy = RateLimitPolicy::try_from(&watch.provider).context("Invalid provider pacing")?;
    let client = RateLimitedClient::new(provider, policy);

    // ── Notification channels ────────────────────────────────────────────────
    let mut dispatcher = Dispatcher::new();
    if let Some(url) = &cfg.discord_webhook_url {
        dispatcher.push(Box::new(DiscordWebhook::new(url)?));
    }
    match (&cfg.telegram_token, cfg.telegram_chat_ids.is_empty()) {
        (Some(token), false) => {
            dispatcher.push(Box::new(TelegramNotifier::new(token, &cfg.telegram_chat_ids)));
        }
        (Some(_), true) => warn!("TELEGRAM_TOKEN set without TELEGRAM_CHAT_IDS, Telegram disabled"),
        _ => {}
    }
    if dispatcher.is_empty() {
        warn!("No notification channel configured, alerts go to the log only");
        dispatcher.push(Box::new(LogNotifier));
    }
    info!(channels = ?dispatcher.channel_names(), "Notification channels ready");
    let notifier: Arc<dyn Notifier> = Arc::new(dispatcher);

    // ── Scheduler ────────────────────────────────────────────────────────────
    let (source, interval_minutes) = match cfg.mode {
        TrackerMode::Tracker => {
            let items = match &cfg.skin_to_track {
                Some(item) => vec![item.clone()],
                None => watch.tracker.items.clone(),
            };
            anyhow::ensure!(!items.is_empty(), "Tracker mode needs at least one item");
            (ItemSource::Watchlist(items), watch.tracker.interval_minutes)
        }
        TrackerMode::Scanner => (
            ItemSource::MarketScan(ScanFilter::from(&watch.scanner)),
            watch.scanner.interval_minutes,
        ),
    };

    let mut scheduler = Scheduler::new(
        client,
        SignalEvaluator::new(watch.signals.clone()),
        AlertGate::from_minutes(watch.alerts.cooldown_minutes),
        notifier,
        source,
        Duration::from_secs(interval_minutes * 60),
    )
    .with_messages(watch.alerts.startup_message, watch.alerts.daily_summary);
    if let Some(store) = store {
        scheduler = scheduler.with_store(store);
    }

    // ── Shutdown ─────────────────────────────────────────────────────────────
    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, finishing current item"),
            Err(e) => warn!(error = %e, "Failed to listen for ctrl-c, shutting down"),
        }
        trigger.trigger();
    });

    let stats = scheduler.run(shutdown).await;
    info!(
        cycles = stats.cycles,
        signals = stats.signals_detected,
        alerts = stats.alerts_sent,
        "Skinwatch stopped"
    );
    Ok(())
}
