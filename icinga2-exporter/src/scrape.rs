//! Scrape orchestration.
//!
//! A scrape of one target queries the Icinga2 API for the target's services
//! and, when enabled, its host object. Both queries run concurrently and
//! both must finish before anything is rendered. A transport failure of
//! either query fails the whole scrape; there are no partial results.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::mapping::{METADATA_FIELDS, MetricNamer, metadata_value};
use crate::model::{HostRecord, QueryResponse, ServiceRecord};
use crate::monitor::MonitorConnection;
use crate::perfdata;
use crate::stats::{ScrapeStats, StatsRecorder};
use crate::store::{LabelSet, MetricStore};

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Rendered result of a successful scrape.
#[derive(Debug, Clone)]
pub struct ScrapeOutput {
    pub body: String,
    pub content_type: &'static str,
    /// Number of rendered series, including the scrape duration.
    pub series: usize,
}

/// Scrapes targets through a shared Icinga2 connection.
pub struct Scraper {
    monitor: Arc<MonitorConnection>,
    namer: MetricNamer,
    stats: StatsRecorder,
}

/// Shareable scraper handle.
pub type SharedScraper = Arc<Scraper>;

impl Scraper {
    pub fn new(monitor: Arc<MonitorConnection>) -> Self {
        let namer = MetricNamer::new(monitor.config());
        Self {
            monitor,
            namer,
            stats: StatsRecorder::new(),
        }
    }

    pub fn stats(&self) -> ScrapeStats {
        self.stats.snapshot()
    }

    /// Scrape all metrics of `target`.
    pub async fn scrape(&self, target: &str) -> Result<ScrapeOutput, ScrapeError> {
        let start = Instant::now();
        self.stats.record_scrape();

        let (services, host) = tokio::join!(
            self.monitor.query_services(target),
            self.fetch_host(target)
        );

        let (services, host) = match (services, host) {
            (Ok(services), Ok(host)) => (services, host),
            (Err(e), _) | (_, Err(e)) => {
                self.stats.record_failure(&e);
                warn!(
                    host = %target,
                    url = %e.url(),
                    timeout = e.is_timeout(),
                    error = %e,
                    "Scrape failed"
                );
                return Err(e);
            }
        };

        let mut store = MetricStore::new();
        self.collect_services(&mut store, &services.results);
        if let Some(host) = host {
            self.collect_hosts(&mut store, &host.results);
        }

        let duration_labels: LabelSet = [("target", target), ("url", self.monitor.url())]
            .into_iter()
            .collect();
        let elapsed = start.elapsed();
        store.put(
            &self.namer.scrape_duration(),
            &duration_labels,
            elapsed.as_secs_f64(),
        );

        let body = store.render();

        info!(
            host = %target,
            series = store.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Scrape completed"
        );

        Ok(ScrapeOutput {
            body,
            content_type: CONTENT_TYPE,
            series: store.len(),
        })
    }

    async fn fetch_host(
        &self,
        target: &str,
    ) -> Result<Option<QueryResponse<HostRecord>>, ScrapeError> {
        if !self.monitor.config().enable_scrape_metadata {
            return Ok(None);
        }
        self.monitor.query_host(target).await.map(Some)
    }

    /// Add metadata and performance data metrics of services.
    ///
    /// Services without performance data in their last check result are
    /// skipped entirely.
    pub fn collect_services(&self, store: &mut MetricStore, services: &[ServiceRecord]) {
        for service in services {
            let Some(entries) = service.performance_data() else {
                continue;
            };
            let attrs = &service.attrs;

            let mut labels = LabelSet::new();
            labels.insert("hostname", attrs.host_name.as_str());
            labels.insert("service", attrs.display_name.as_str());
            if let Some(vars) = service.host_vars() {
                labels.extend(self.namer.custom_var_labels(vars));
            }

            for field in METADATA_FIELDS {
                if let Some(value) = metadata_value(attrs.state.get(field)) {
                    let name = self.namer.service_metadata(&attrs.check_command, field);
                    store.put(&name, &labels, value);
                }
            }

            for entry in entries {
                for measurement in perfdata::parse(entry) {
                    let (name, extra_label) =
                        self.namer.perfdata(&attrs.check_command, &measurement);
                    match extra_label {
                        Some((label, value)) => {
                            store.put(&name, &labels.with(label, value), measurement.value)
                        }
                        None => store.put(&name, &labels, measurement.value),
                    }
                }
            }

            debug!(
                host = %attrs.host_name,
                service = %attrs.display_name,
                check_command = %attrs.check_command,
                "Collected service"
            );
        }
    }

    /// Add host metadata metrics.
    pub fn collect_hosts(&self, store: &mut MetricStore, hosts: &[HostRecord]) {
        for host in hosts {
            let attrs = &host.attrs;
            if attrs.full_name.is_none() {
                continue;
            }

            let mut labels = LabelSet::new();
            labels.insert("hostname", attrs.name.as_str());
            labels.insert(
                "service",
                self.monitor.config().host_alive_service.as_str(),
            );
            if let Some(address) = &attrs.address {
                labels.insert("address", address.as_str());
            }
            if let Some(vars) = &attrs.vars {
                labels.extend(self.namer.custom_var_labels(vars));
            }

            for field in METADATA_FIELDS {
                if let Some(value) = metadata_value(attrs.state.get(field)) {
                    store.put(&self.namer.host_metadata(field), &labels, value);
                }
            }
        }
    }
}
