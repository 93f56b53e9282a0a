//! Error types for the exporter.

use thiserror::Error;

/// Failure of a scrape.
///
/// Only transport failures abort a scrape. Malformed performance data and
/// non-2xx API responses are logged and scraped around.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The API did not answer within the configured timeout.
    #[error("Request to {url} timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API could not be reached.
    #[error("Connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ScrapeError {
    /// Classify a transport error of a request to `url`.
    pub fn from_transport(url: impl Into<String>, err: reqwest::Error) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::Timeout { url, source: err }
        } else {
            Self::Connection { url, source: err }
        }
    }

    /// URL of the failed request.
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. } | Self::Connection { url, .. } => url,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors setting up the Icinga2 API client.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}
