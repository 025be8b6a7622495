use crate::{DataSource, Error, Result, TrackerMode};

/// Secrets and deployment switches loaded from environment variables at
/// startup. Tunable thresholds live in the TOML watch file instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: TrackerMode,
    pub data_source: DataSource,

    // Skinport credentials (live only)
    pub skinport_client_id: Option<String>,
    pub skinport_client_secret: Option<String>,

    // Replay fixture (replay only)
    pub replay_fixture_path: Option<String>,

    /// Overrides the tracker watch-list with a single item.
    pub skin_to_track: Option<String>,

    pub watch_config_path: String,

    // Notification channels
    pub discord_webhook_url: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_ids: Vec<i64>,

    // Audit store
    pub database_url: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match optional("SKINWATCH_MODE")
            .unwrap_or_else(|| "tracker".to_string())
            .to_lowercase()
            .as_str()
        {
            "tracker" => TrackerMode::Tracker,
            "scanner" => TrackerMode::Scanner,
            other => {
                return Err(Error::Config(format!(
                    "SKINWATCH_MODE must be 'tracker' or 'scanner', got: '{other}'"
                )))
            }
        };

        let data_source = match optional("DATA_SOURCE")
            .unwrap_or_else(|| "live".to_string())
            .to_lowercase()
            .as_str()
        {
            "live" => DataSource::Live,
            "replay" => DataSource::Replay,
            other => {
                return Err(Error::Config(format!(
                    "DATA_SOURCE must be 'live' or 'replay', got: '{other}'"
                )))
            }
        };

        let skinport_client_id = optional("SKINPORT_CLIENT_ID");
        let skinport_client_secret = optional("SKINPORT_CLIENT_SECRET");
        let replay_fixture_path = optional("REPLAY_FIXTURE_PATH");

        match data_source {
            DataSource::Live => {
                if skinport_client_id.is_none() || skinport_client_secret.is_none() {
                    return Err(Error::Config(
                        "SKINPORT_CLIENT_ID and SKINPORT_CLIENT_SECRET are required when DATA_SOURCE=live"
                            .to_string(),
                    ));
                }
            }
            DataSource::Replay => {
                if replay_fixture_path.is_none() {
                    return Err(Error::Config(
                        "REPLAY_FIXTURE_PATH is required when DATA_SOURCE=replay".to_string(),
                    ));
                }
            }
        }

        let telegram_chat_ids = match optional("TELEGRAM_CHAT_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|_| {
                        Error::Config(format!("TELEGRAM_CHAT_IDS contains non-numeric ID: '{s}'"))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Config {
            mode,
            data_source,
            skinport_client_id,
            skinport_client_secret,
            replay_fixture_path,
            skin_to_track: optional("SKIN_TO_TRACK"),
            watch_config_path: optional("WATCH_CONFIG_PATH")
                .unwrap_or_else(|| "config/skinwatch.toml".to_string()),
            discord_webhook_url: optional("DISCORD_WEBHOOK_URL"),
            telegram_token: optional("TELEGRAM_TOKEN"),
            telegram_chat_ids,
            database_url: optional("DATABASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn live_defaults_to_tracker() {
        let cfg = Config::from_lookup(lookup(&[
            ("SKINPORT_CLIENT_ID", "id"),
            ("SKINPORT_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(cfg.mode, TrackerMode::Tracker);
        assert_eq!(cfg.data_source, DataSource::Live);
        assert_eq!(cfg.watch_config_path, "config/skinwatch.toml");
        assert!(cfg.telegram_chat_ids.is_empty());
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn live_without_credentials_is_rejected() {
        let err = Config::from_lookup(lookup(&[("SKINPORT_CLIENT_ID", "id")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn replay_requires_fixture() {
        let err = Config::from_lookup(lookup(&[("DATA_SOURCE", "replay")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let cfg = Config::from_lookup(lookup(&[
            ("DATA_SOURCE", "replay"),
            ("REPLAY_FIXTURE_PATH", "fixtures/replay.json"),
            ("SKINWATCH_MODE", "Scanner"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_source, DataSource::Replay);
        assert_eq!(cfg.mode, TrackerMode::Scanner);
    }

    #[test]
    fn parses_telegram_chat_ids() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATA_SOURCE", "replay"),
            ("REPLAY_FIXTURE_PATH", "fixtures/replay.json"),
            ("TELEGRAM_CHAT_IDS", "123, -456,"),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram_chat_ids, vec![123, -456]);

        let err = Config::from_lookup(lookup(&[
            ("DATA_SOURCE", "replay"),
            ("REPLAY_FIXTURE_PATH", "fixtures/replay.json"),
            ("TELEGRAM_CHAT_IDS", "123,abc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("SKINWATCH_MODE", "sniper"),
            ("DATA_SOURCE", "replay"),
            ("REPLAY_FIXTURE_PATH", "x.json"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
