//! Error types for prayerbot.

use thiserror::Error;

/// Errors shared by every prayerbot crate.
#[derive(Debug, Error)]
pub enum PrayerError {
    /// The referenced prayer group does not exist.
    #[error("Prayer group not found: {0}")]
    NotFound(String),

    /// Malformed group name or schedule parameters.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Chat transport or API failure.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Persistence failure. There is no safe partial-write mode, so callers stop.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrayerError {
    /// Whether the process should stop rather than carry on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PrayerError>;
