//! Exporter statistics.

use parking_lot::RwLock;

use crate::error::ScrapeError;

/// Scrape counters since process start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    /// Scrapes requested.
    pub scrapes_total: u64,
    /// Scrapes aborted by an API timeout.
    pub timeouts_total: u64,
    /// Scrapes aborted by an API connection failure.
    pub connection_errors_total: u64,
}

impl ScrapeStats {
    /// Scrapes that returned no metrics because of a transport failure.
    pub fn failures_total(&self) -> u64 {
        self.timeouts_total + self.connection_errors_total
    }
}

/// Thread-safe scrape counters.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    stats: RwLock<ScrapeStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scrape(&self) {
        self.stats.write().scrapes_total += 1;
    }

    pub fn record_failure(&self, err: &ScrapeError) {
        let mut stats = self.stats.write();
        match err {
            ScrapeError::Timeout { .. } => stats.timeouts_total += 1,
            ScrapeError::Connection { .. } => stats.connection_errors_total += 1,
        }
    }

    pub fn snapshot(&self) -> ScrapeStats {
        self.stats.read().clone()
    }
}
