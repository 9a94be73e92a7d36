//! Error kinds surfaced by fetching, parsing and rate-limit handling.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Request for {locator} failed: {source}")]
    Network {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{locator} returned status {status}: {message}")]
    Http {
        locator: String,
        status: u16,
        message: String,
    },

    #[error("Could not parse response from {locator}: {source}")]
    Parse {
        locator: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Response from {locator} is not JSON")]
    NotJson { locator: String },

    #[error("API rate limit exhausted until {reset}")]
    RateLimited {
        reset: DateTime<Utc>,
        reload_requested: bool,
    },

    #[error("Request for {locator} was rate limited, but the limit is not exhausted")]
    RateLimitTransient { locator: String },

    #[error("Cache store error: {0}")]
    Store(String),
}

impl SiteError {
    /// Only an exhausted limit aborts a load. Optional lookups degrade on
    /// everything else, transient rate limits included.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, SiteError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, SiteError>;
