//! Icinga2 object query responses.
//!
//! Only the attributes the exporter uses are modeled. Every field has a
//! default so that partial objects still deserialize.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::perfdata::PerfdataEntry;

/// Body of `/v1/objects/*` query responses.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T: DeserializeOwned> QueryResponse<T> {
    /// Decode a response body one object at a time.
    ///
    /// Objects that don't decode are logged and skipped. Only a body that
    /// isn't a query response at all is an error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: QueryResponse<Value> = serde_json::from_slice(bytes)?;

        let results = raw
            .results
            .into_iter()
            .filter_map(|object| {
                let name = object
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                match serde_json::from_value(object) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(object = %name, error = %e, "Skipping undecodable Icinga2 object");
                        None
                    }
                }
            })
            .collect();

        Ok(Self { results })
    }
}

impl<T> Default for QueryResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
        }
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub status: Option<String>,
}

/// One service object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceRecord {
    #[serde(default)]
    pub attrs: ServiceAttrs,
    #[serde(default)]
    pub joins: Joins,
}

impl ServiceRecord {
    /// Performance data of the last check result, if there was any.
    pub fn performance_data(&self) -> Option<&[PerfdataEntry]> {
        self.attrs
            .last_check_result
            .as_ref()?
            .performance_data
            .as_deref()
    }

    /// Custom variables of the service's host.
    pub fn host_vars(&self) -> Option<&Map<String, Value>> {
        self.joins.host.as_ref()?.vars.as_ref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAttrs {
    #[serde(default)]
    pub host_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub check_command: String,
    #[serde(default)]
    pub last_check_result: Option<CheckResult>,
    #[serde(flatten)]
    pub state: StateAttrs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckResult {
    #[serde(default)]
    pub performance_data: Option<Vec<PerfdataEntry>>,
}

/// Joined objects of a service query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Joins {
    #[serde(default)]
    pub host: Option<HostJoin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostJoin {
    #[serde(default)]
    pub vars: Option<Map<String, Value>>,
}

/// One host object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostRecord {
    #[serde(default)]
    pub attrs: HostAttrs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostAttrs {
    #[serde(default, rename = "__name")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub vars: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub state: StateAttrs,
}

/// State attributes shared by hosts and services.
///
/// Kept as raw JSON values: Icinga2 reports some of them as numbers and
/// some as booleans.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateAttrs {
    #[serde(default)]
    pub downtime_depth: Option<Value>,
    #[serde(default)]
    pub acknowledgement: Option<Value>,
    #[serde(default)]
    pub max_check_attempts: Option<Value>,
    #[serde(default)]
    pub last_reachable: Option<Value>,
    #[serde(default)]
    pub state: Option<Value>,
    #[serde(default)]
    pub state_type: Option<Value>,
}

impl StateAttrs {
    /// Look up a state attribute by its API name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match field {
            "downtime_depth" => self.downtime_depth.as_ref(),
            "acknowledgement" => self.acknowledgement.as_ref(),
            "max_check_attempts" => self.max_check_attempts.as_ref(),
            "last_reachable" => self.last_reachable.as_ref(),
            "state" => self.state.as_ref(),
            "state_type" => self.state_type.as_ref(),
            _ => None,
        }
    }
}
