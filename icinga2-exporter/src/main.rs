//! Prometheus exporter for Icinga2.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use icinga2_exporter::{ExporterConfig, HttpServer, MonitorConnection, Scraper};

/// Prometheus exporter for Icinga2.
#[derive(Parser, Debug)]
#[command(name = "icinga2-exporter")]
#[command(about = "Export Icinga2 check results and performance data as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, default_value = "config.json5")]
    config: String,

    /// HTTP listen address (overrides config).
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level (overrides config).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ExporterConfig::load_from_file(&args.config)
        .map_err(|e| anyhow::anyhow!("{}: {}", args.config, e))?;

    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    icinga2_exporter::init_tracing(&config.logging)?;

    info!(config = %args.config, "Starting Icinga2 exporter");

    let listen_addr = config
        .server
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let monitor = Arc::new(MonitorConnection::new(config.icinga2.clone())?);
    let scraper = Arc::new(Scraper::new(monitor));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(scraper.clone(), listen_addr, config.server.path.clone());
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    let stats = scraper.stats();
    info!(
        scrapes_total = stats.scrapes_total,
        timeouts_total = stats.timeouts_total,
        connection_errors_total = stats.connection_errors_total,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
