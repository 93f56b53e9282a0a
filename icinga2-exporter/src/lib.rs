//! Prometheus exporter for Icinga2.
//!
//! For every scrape of `/metrics?target=<host>` the exporter queries the
//! Icinga2 REST API for the services (and optionally the host object) of
//! `<host>`, converts their check results and performance data into
//! Prometheus metrics and returns them in the text exposition format.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Icinga2 API   │<────│     Scraper     │<────│   HTTP Server   │
//! │ (/v1/objects/*) │────>│ (parse + name)  │────>│   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! icinga2-exporter --config config.json5
//! curl 'http://localhost:9638/metrics?target=web01'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod config;
pub mod error;
pub mod http;
pub mod mapping;
pub mod model;
pub mod monitor;
pub mod perfdata;
pub mod scrape;
pub mod stats;
pub mod store;
pub mod units;

pub use config::{ExporterConfig, LogFormat, LoggingConfig};
pub use error::{MonitorError, ScrapeError};
pub use http::HttpServer;
pub use monitor::MonitorConnection;
pub use scrape::{ScrapeOutput, Scraper, SharedScraper};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
    }

    Ok(())
}
