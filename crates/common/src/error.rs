use std::time::Duration;

use thiserror::Error;

use crate::Window;

#[derive(Debug, Error)]
pub enum Error {
    /// Raw "too many requests" answer from the price provider. Handled by the
    /// rate-limited client; callers above it only ever see `ProviderUnavailable`.
    #[error("Rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Price provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// Not a failure: the window holds no samples, so it has no opinion.
    #[error("Insufficient data for {window} window")]
    InsufficientData { window: Window },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Notification delivery failed: {0}")]
    NotificationDeliveryFailed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transport-level failures that make the provider unusable for the
    /// current item. The scheduler skips the item and moves on.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. }
                | Error::ProviderUnavailable(_)
                | Error::Http(_)
                | Error::Timeout(_)
                | Error::Auth(_)
                | Error::MalformedResponse(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
