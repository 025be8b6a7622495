use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use common::{PriceSample, Result, SignalKind, TradingSignal};

/// Optional SQLite audit trail of samples and signals.
///
/// Nothing in the poll loop depends on it: the scheduler logs and ignores
/// every store failure.
#[derive(Clone)]
pub struct SignalStore {
    pool: SqlitePool,
}

/// A signal row as persisted.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredSignal {
    pub id: String,
    pub item: String,
    pub kind: SignalKind,
    pub current_price: f64,
    pub reference_price: f64,
    pub drop_pct: f64,
    pub edge_pct: f64,
    pub volume_24h: i64,
    /// RFC 3339.
    pub detected_at: String,
    pub alerted: bool,
}

/// A price sample row as persisted.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredSample {
    pub item: String,
    pub price: f64,
    pub volume: i64,
    /// RFC 3339.
    pub sampled_at: String,
}

impl SignalStore {
    /// Open (creating if needed) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations on it.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        info!("Audit store ready");
        Ok(Self { pool })
    }

    pub async fn record_sample(&self, sample: &PriceSample) -> Result<()> {
        sqlx::query("INSERT INTO price_samples (item, price, volume, sampled_at) VALUES (?, ?, ?, ?)")
            .bind(&sample.item)
            .bind(sample.price)
            .bind(i64::from(sample.volume))
            .bind(sample.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_signal(&self, signal: &TradingSignal) -> Result<()> {
        sqlx::query(
            "INSERT INTO signals \
             (id, item, kind, current_price, reference_price, drop_pct, edge_pct, volume_24h, detected_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&signal.id)
        .bind(&signal.item)
        .bind(signal.kind)
        .bind(signal.current_price)
        .bind(signal.reference_price)
        .bind(signal.drop_pct)
        .bind(signal.edge_pct)
        .bind(signal.volume_24h as i64)
        .bind(signal.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Flag a signal as delivered to at least one channel.
    pub async fn mark_alerted(&self, signal_id: &str) -> Result<()> {
        sqlx::query("UPDATE signals SET alerted = 1 WHERE id = ?")
            .bind(signal_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Most recent signals first.
    pub async fn recent_signals(&self, limit: i64) -> Result<Vec<StoredSignal>> {
        let rows = sqlx::query_as::<_, StoredSignal>(
            "SELECT id, item, kind, current_price, reference_price, drop_pct, edge_pct, \
                    volume_24h, detected_at, alerted \
             FROM signals ORDER BY detected_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Newest sample recorded for `item`, if any.
    pub async fn latest_sample(&self, item: &str) -> Result<Option<StoredSample>> {
        let row = sqlx::query_as::<_, StoredSample>(
            "SELECT item, price, volume, sampled_at FROM price_samples \
             WHERE item = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(item)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn sample_count(&self, item: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_samples WHERE item = ?")
            .bind(item)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
