use std::time::Duration;

use thiserror::Error;

/// Errors raised by the tracker layers below the operation handlers.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("JIRA configuration is incomplete: {0}")]
    Config(String),

    #[error("Not connected to JIRA: {0}")]
    Connection(String),

    #[error("Issue does not exist: {0}")]
    NotFound(String),

    #[error("JIRA returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JIRA request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected JIRA response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Rate limit wait of {needed:.2?} exceeds the allowed {allowed:.2?}")]
    RateLimited { needed: Duration, allowed: Duration },
}

pub type Result<T> = std::result::Result<T, TrackerError>;
