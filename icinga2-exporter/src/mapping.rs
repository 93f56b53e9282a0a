//! Mapping from Icinga2 check results to Prometheus metric names and labels.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::config::{Icinga2Config, PerfnameLabel};
use crate::perfdata::Measurement;

/// Check result attributes exported as `*_metadata_*` metrics.
pub const METADATA_FIELDS: [&str; 6] = [
    "downtime_depth",
    "acknowledgement",
    "max_check_attempts",
    "last_reachable",
    "state",
    "state_type",
];

/// Replace every character outside `[a-zA-Z0-9:_]` with an underscore.
///
/// The result has the same number of characters as the input and applying
/// it twice is the same as applying it once.
pub fn sanitize_metric_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize a label name to be Prometheus-compatible.
///
/// Prometheus label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Labels starting with `__` are reserved for internal use.
pub fn sanitize_label_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_underscore = false;

    for (i, c) in name.chars().enumerate() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        };

        if valid {
            result.push(c);
            last_was_underscore = c == '_';
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.ends_with('_') {
        result.pop();
    }

    if result.is_empty() {
        return "label".to_string();
    }

    if result.starts_with("__") {
        result.insert(0, 'z');
    }

    result
}

/// Build the metric name for a measurement and the label carrying its
/// name, if any.
///
/// Typically `<prefix><check_command>_<perfname>[_<unit>]`. When the check
/// command has a perfname-to-label mapping the perfname is left out of the
/// name, giving `<prefix><check_command>[_<unit>]`, and is returned as the
/// value of the configured label instead.
pub fn build(
    prefix: &str,
    check_command: &str,
    measurement: &Measurement,
    perfname_to_label: &HashMap<String, PerfnameLabel>,
) -> (String, Option<(String, String)>) {
    let mapping = perfname_to_label.get(check_command);

    let mut name = format!("{}{}", prefix, check_command);
    if mapping.is_none() {
        name.push('_');
        name.push_str(&measurement.name.to_lowercase());
    }
    if !measurement.unit.is_unitless() {
        name.push('_');
        name.push_str(measurement.unit.as_str());
    }

    let extra_label = mapping.map(|m| {
        (
            sanitize_label_name(&m.label_name.to_lowercase()),
            measurement.name.clone(),
        )
    });

    (sanitize_metric_name(&name), extra_label)
}

/// Convert a metadata attribute to a sample value.
///
/// Booleans become `1`/`0`. Missing and non-numeric values have no sample.
pub fn metadata_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Metric naming rules derived from the Icinga2 configuration.
#[derive(Debug, Clone)]
pub struct MetricNamer {
    prefix: String,
    custom_vars: HashMap<String, String>,
    perfname_to_label: HashMap<String, PerfnameLabel>,
}

impl MetricNamer {
    pub fn new(config: &Icinga2Config) -> Self {
        Self {
            prefix: config.prefix(),
            custom_vars: config.custom_vars.clone(),
            perfname_to_label: config.perfnametolabel.clone(),
        }
    }

    /// The metric prefix including its trailing underscore.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name and extra label for a performance data measurement.
    pub fn perfdata(
        &self,
        check_command: &str,
        measurement: &Measurement,
    ) -> (String, Option<(String, String)>) {
        build(
            &self.prefix,
            check_command,
            measurement,
            &self.perfname_to_label,
        )
    }

    /// `<prefix><check_command>_metadata_<field>`
    pub fn service_metadata(&self, check_command: &str, field: &str) -> String {
        sanitize_metric_name(&format!(
            "{}{}_metadata_{}",
            self.prefix,
            check_command,
            field.to_lowercase()
        ))
    }

    /// `<prefix>host_metadata_<field>`
    pub fn host_metadata(&self, field: &str) -> String {
        sanitize_metric_name(&format!(
            "{}host_metadata_{}",
            self.prefix,
            field.to_lowercase()
        ))
    }

    /// `<prefix>scrape_duration_seconds`
    pub fn scrape_duration(&self) -> String {
        sanitize_metric_name(&format!("{}scrape_duration_seconds", self.prefix))
    }

    /// Labels from host custom variables, in source order.
    ///
    /// Only string values are kept: Icinga2 custom variables may be
    /// arrays or dictionaries, which are dropped rather than coerced.
    /// Names are lowercased unless a label name is configured for the
    /// variable in `custom_vars`.
    pub fn custom_var_labels(&self, vars: &Map<String, Value>) -> Vec<(String, String)> {
        vars.iter()
            .filter_map(|(key, value)| {
                let Value::String(value) = value else {
                    return None;
                };
                let name = match self.custom_vars.get(key) {
                    Some(label) => label.clone(),
                    None => key.to_lowercase(),
                };
                Some((sanitize_label_name(&name), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;
    use serde_json::json;

    fn measurement(name: &str, value: f64, unit: Unit) -> Measurement {
        Measurement {
            name: name.to_string(),
            value,
            unit,
        }
    }

    fn disk_mapping() -> HashMap<String, PerfnameLabel> {
        let mut table = HashMap::new();
        table.insert(
            "disk".to_string(),
            PerfnameLabel {
                label_name: "Disk".to_string(),
            },
        );
        table
    }

    #[test]
    fn test_sanitize_metric_name() {
        assert_eq!(sanitize_metric_name("icinga2_load_load1"), "icinga2_load_load1");
        assert_eq!(sanitize_metric_name("icinga2_disk_/var/log"), "icinga2_disk__var_log");
        assert_eq!(sanitize_metric_name("a-b.c d"), "a_b_c_d");
        assert_eq!(sanitize_metric_name("foo:bar"), "foo:bar");
        assert_eq!(sanitize_metric_name("väg"), "v_g");
    }

    #[test]
    fn test_sanitize_metric_name_idempotent() {
        for input in ["C:\\ used space", "http-/api/v1", "ok_name", "", "a..b", "ü€x"] {
            let once = sanitize_metric_name(input);
            assert_eq!(sanitize_metric_name(&once), once);
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
            );
        }
    }

    #[test]
    fn test_sanitize_label_name() {
        assert_eq!(sanitize_label_name("environment"), "environment");
        assert_eq!(sanitize_label_name("os-family"), "os_family");
        assert_eq!(sanitize_label_name("1st"), "_st");
        assert_eq!(sanitize_label_name("__meta"), "z__meta");
        assert_eq!(sanitize_label_name("..."), "label");
    }

    #[test]
    fn test_build_with_unit() {
        let m = measurement("RTA", 0.001, Unit::Seconds);
        let (name, extra) = build("icinga2_", "ping4", &m, &HashMap::new());

        assert_eq!(name, "icinga2_ping4_rta_seconds");
        assert_eq!(extra, None);
    }

    #[test]
    fn test_build_without_unit() {
        let m = measurement("load1", 0.05, Unit::Unitless);
        let (name, _) = build("icinga2_", "load", &m, &HashMap::new());

        assert_eq!(name, "icinga2_load_load1");
    }

    #[test]
    fn test_build_quoted_perfname() {
        let m = crate::perfdata::parse_text("'time total'=12ms");
        let (name, _) = build("icinga2_", "http", &m[0], &HashMap::new());

        assert_eq!(name, "icinga2_http__time_total__seconds");

        let (name, extra) = build("icinga2_", "disk", &m[0], &disk_mapping());
        assert_eq!(name, "icinga2_disk_seconds");
        assert_eq!(extra, Some(("disk".to_string(), "'time total'".to_string())));
    }

    #[test]
    fn test_build_with_perfname_label_collapses_names() {
        let table = disk_mapping();
        let c = measurement("C:\\", 50.0, Unit::Bytes);
        let d = measurement("D:\\", 70.0, Unit::Bytes);

        let (name_c, label_c) = build("icinga2_", "disk", &c, &table);
        let (name_d, label_d) = build("icinga2_", "disk", &d, &table);

        assert_eq!(name_c, "icinga2_disk_bytes");
        assert_eq!(name_c, name_d);
        assert_eq!(label_c, Some(("disk".to_string(), "C:\\".to_string())));
        assert_eq!(label_d, Some(("disk".to_string(), "D:\\".to_string())));
    }

    #[test]
    fn test_metadata_value() {
        assert_eq!(metadata_value(Some(&json!(true))), Some(1.0));
        assert_eq!(metadata_value(Some(&json!(false))), Some(0.0));
        assert_eq!(metadata_value(Some(&json!(2.0))), Some(2.0));
        assert_eq!(metadata_value(Some(&json!(3))), Some(3.0));
        assert_eq!(metadata_value(Some(&json!(null))), None);
        assert_eq!(metadata_value(Some(&json!("1"))), None);
        assert_eq!(metadata_value(None), None);
    }

    #[test]
    fn test_namer_metadata_names() {
        let namer = MetricNamer::new(&Icinga2Config::default());

        assert_eq!(namer.prefix(), "icinga2_");
        assert_eq!(
            namer.service_metadata("http", "state_type"),
            "icinga2_http_metadata_state_type"
        );
        assert_eq!(
            namer.host_metadata("downtime_depth"),
            "icinga2_host_metadata_downtime_depth"
        );
        assert_eq!(namer.scrape_duration(), "icinga2_scrape_duration_seconds");
    }

    #[test]
    fn test_custom_var_labels_keep_strings_in_order() {
        let mut config = Icinga2Config::default();
        config
            .custom_vars
            .insert("env".to_string(), "environment".to_string());
        let namer = MetricNamer::new(&config);

        let vars = json!({
            "OS": "Linux",
            "env": "prod",
            "disks": {"/": {"disk_partitions": "/"}},
            "notify": true,
            "retries": 3,
            "Team-Name": "ops"
        });
        let labels = namer.custom_var_labels(vars.as_object().unwrap());

        assert_eq!(
            labels,
            vec![
                ("os".to_string(), "Linux".to_string()),
                ("environment".to_string(), "prod".to_string()),
                ("team_name".to_string(), "ops".to_string()),
            ]
        );
    }
}
