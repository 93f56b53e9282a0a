//! Icinga2 REST API client.

use std::time::Instant;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::Icinga2Config;
use crate::error::{MonitorError, ScrapeError};
use crate::mapping::METADATA_FIELDS;
use crate::model::{ApiError, HostRecord, QueryResponse, ServiceRecord};

/// Connection to the Icinga2 API.
///
/// Built once at startup and shared read-only by all scrapes.
#[derive(Debug, Clone)]
pub struct MonitorConnection {
    client: reqwest::Client,
    config: Icinga2Config,
    services_url: String,
    hosts_url: String,
}

impl MonitorConnection {
    /// Create a connection from the Icinga2 configuration.
    pub fn new(config: Icinga2Config) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        // Icinga2 reads the query from a POST body only with this override.
        headers.insert("X-HTTP-Method-Override", HeaderValue::from_static("GET"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .default_headers(headers)
            .user_agent(concat!("icinga2-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let services_url = format!("{}/v1/objects/services", config.base_url());
        let hosts_url = format!("{}/v1/objects/hosts", config.base_url());

        info!(
            url = %config.base_url(),
            verify_tls = config.verify_tls,
            timeout_secs = config.timeout_secs,
            "Initialized Icinga2 API client"
        );

        Ok(Self {
            client,
            config,
            services_url,
            hosts_url,
        })
    }

    pub fn config(&self) -> &Icinga2Config {
        &self.config
    }

    /// Base URL of the Icinga2 API.
    pub fn url(&self) -> &str {
        self.config.base_url()
    }

    /// Query all services of `hostname` with their last check result and
    /// the custom variables of the host.
    pub async fn query_services(
        &self,
        hostname: &str,
    ) -> Result<QueryResponse<ServiceRecord>, ScrapeError> {
        let body = service_query(hostname);
        let response = self.post(&self.services_url, &body).await?;

        if response.results.is_empty() {
            warn!(host = %hostname, "Received no performance data from Icinga2");
        }

        Ok(response)
    }

    /// Query the host object of `hostname`.
    pub async fn query_host(
        &self,
        hostname: &str,
    ) -> Result<QueryResponse<HostRecord>, ScrapeError> {
        let body = host_query(hostname);
        self.post(&self.hosts_url, &body).await
    }

    /// POST an object query.
    ///
    /// Transport failures are errors. Non-2xx statuses and undecodable
    /// bodies are logged and yield an empty response.
    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<QueryResponse<T>, ScrapeError> {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.user, Some(&self.config.passwd))
            .json(body)
            .send()
            .await
            .map_err(|e| ScrapeError::from_transport(url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScrapeError::from_transport(url, e))?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        debug!(url = %url, status = status.as_u16(), elapsed_ms, "Icinga2 API call");

        if !status.is_success() {
            let api_error: ApiError = serde_json::from_slice(&bytes).unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                error = ?api_error.error,
                detail = ?api_error.status,
                "Icinga2 API returned an error, treating as no data"
            );
            return Ok(QueryResponse::default());
        }

        info!(url = %url, status = status.as_u16(), elapsed_ms, "Called Icinga2 API");

        match QueryResponse::from_slice(&bytes) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to decode Icinga2 API response");
                Ok(QueryResponse::default())
            }
        }
    }
}

/// Request body of the service query for `hostname`.
pub fn service_query(hostname: &str) -> Value {
    let mut attrs = vec![
        "__name",
        "display_name",
        "check_command",
        "last_check_result",
        "vars",
        "host_name",
    ];
    attrs.extend(METADATA_FIELDS);

    json!({
        "joins": ["host.vars"],
        "attrs": attrs,
        "filter": format!("service.host_name==\"{}\"", escape_filter_string(hostname)),
    })
}

/// Request body of the host query for `hostname`.
pub fn host_query(hostname: &str) -> Value {
    let mut attrs = vec!["__name", "name", "address", "vars"];
    attrs.extend(METADATA_FIELDS);

    json!({
        "attrs": attrs,
        "filter": format!("host.name==\"{}\"", escape_filter_string(hostname)),
    })
}

// Icinga2 filters are DSL expressions; keep the target inside its string literal.
fn escape_filter_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
