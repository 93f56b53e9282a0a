//! Parser for Icinga2 performance data.
//!
//! Icinga2 reports the performance data of a check result either as the
//! classic Nagios plugin string (`'label'=value[UOM];[warn];[crit];[min];[max]`)
//! or, when the check was executed by an Icinga2 agent, as a structured
//! `PerfdataValue` object. Both forms decode into [`Measurement`]s.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::units::{Unit, normalize};

// label=value[UOM][;warn][;crit][;min][;max]
// The label is either a run of non-whitespace or a quoted string that may contain spaces.
static PERFDATA_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"([^\s]+|'[^']+')=([-.0-9]+)(c|s|ms|us|B|KB|MB|GB|TB|%)?(?:;([-.0-9]+))?(?:;([-.0-9]+))?(?:;([-.0-9]+))?(?:;([-.0-9]+))?",
    )
    .unwrap()
});

/// One raw performance data entry of a check result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PerfdataEntry {
    /// Classic plugin output string, may hold several measurements.
    Text(String),
    /// Already labeled `PerfdataValue` object.
    Structured(StructuredPerfdata),
    /// Anything else; yields no measurements.
    Unknown(Value),
}

/// Structured performance data as emitted by Icinga2 agents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredPerfdata {
    pub label: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A single normalized measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    /// Create a measurement from a raw value and unit token.
    pub fn new(name: impl Into<String>, value: f64, unit: &str) -> Self {
        let (value, unit) = normalize(value, unit);
        Self {
            name: name.into(),
            value,
            unit,
        }
    }
}

/// Parse one performance data entry.
///
/// Malformed input never fails: unparseable values are skipped and logged.
/// Measurements are unique by name; a repeated name keeps the last value.
pub fn parse(entry: &PerfdataEntry) -> Vec<Measurement> {
    let measurements = match entry {
        PerfdataEntry::Text(s) => parse_text(s),
        PerfdataEntry::Structured(s) => parse_structured(s).into_iter().collect(),
        PerfdataEntry::Unknown(v) => {
            warn!(entry = %v, "Unsupported performance data entry");
            Vec::new()
        }
    };

    dedup_by_name(measurements)
}

/// Parse performance data in plugin string format.
pub fn parse_text(s: &str) -> Vec<Measurement> {
    let mut measurements = Vec::new();
    let mut matched = false;

    for caps in PERFDATA_REGEX.captures_iter(s) {
        matched = true;

        // A quoted label keeps its quotes; name sanitizing turns them into underscores.
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let raw_value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let unit = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        match raw_value.parse::<f64>() {
            Ok(value) => measurements.push(Measurement::new(name, value, unit)),
            Err(_) => warn!(
                perfdata = %s,
                value = %raw_value,
                "Couldn't convert performance data value to float"
            ),
        }
    }

    if !matched {
        warn!(perfdata = %s, "Failed to parse performance data");
    }

    measurements
}

/// Parse a structured `PerfdataValue` record.
///
/// The unit goes through the same normalization as the string form, so
/// both encodings yield identical metric names for the same data.
pub fn parse_structured(perf: &StructuredPerfdata) -> Option<Measurement> {
    let value = match &perf.value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };

    let Some(value) = value else {
        warn!(
            label = %perf.label,
            value = %perf.value,
            "Couldn't convert performance data value to float"
        );
        return None;
    };

    Some(Measurement::new(
        perf.label.clone(),
        value,
        perf.unit.as_deref().unwrap_or_default(),
    ))
}

fn dedup_by_name(measurements: Vec<Measurement>) -> Vec<Measurement> {
    let mut unique: Vec<Measurement> = Vec::with_capacity(measurements.len());
    for m in measurements {
        match unique.iter_mut().find(|u| u.name == m.name) {
            Some(existing) => *existing = m,
            None => unique.push(m),
        }
    }
    unique
}
