//! Scrape-scoped metric store and Prometheus text rendering.

use std::collections::HashMap;
use std::io::Write;

/// Ordered label set.
///
/// Labels render in insertion order. Inserting an existing name replaces
/// its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<(String, String)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a label.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.labels.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.labels.push((name, value)),
        }
    }

    /// Copy of this set with one more label.
    pub fn with(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut labels = self.clone();
        labels.insert(name, value);
        labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Format labels for Prometheus exposition format.
    pub fn format(&self) -> String {
        let parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
            .collect();

        format!("{{{}}}", parts.join(", "))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for LabelSet {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut labels = LabelSet::new();
        labels.extend(iter);
        labels
    }
}

/// Samples collected during one scrape, keyed by their rendered series.
///
/// Series render in the order they were first stored. Storing the same
/// series again overwrites its value.
#[derive(Debug, Default)]
pub struct MetricStore {
    series: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample.
    pub fn put(&mut self, name: &str, labels: &LabelSet, value: f64) {
        let key = format!("{}{}", name, labels.format());
        let value = format_value(value);

        match self.index.get(&key) {
            Some(&i) => self.series[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.series.len());
                self.series.push((key, value));
            }
        }
    }

    /// Number of distinct series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Render all samples in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut output = Vec::with_capacity(self.series.len() * 100);

        for (key, value) in &self.series {
            writeln!(output, "{} {}", key, value).ok();
        }

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_labels() -> LabelSet {
        [("hostname", "h1"), ("service", "load")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_label_set_keeps_insertion_order() {
        let mut labels = LabelSet::new();
        labels.insert("hostname", "h1");
        labels.insert("service", "ping");
        labels.insert("env", "prod");

        assert_eq!(
            labels.format(),
            "{hostname=\"h1\", service=\"ping\", env=\"prod\"}"
        );
    }

    #[test]
    fn test_label_set_replace_keeps_position() {
        let mut labels = host_labels();
        labels.insert("hostname", "h2");

        assert_eq!(labels.len(), 2);
        assert_eq!(labels.format(), "{hostname=\"h2\", service=\"load\"}");
    }

    #[test]
    fn test_label_set_with_does_not_modify_original() {
        let labels = host_labels();
        let extended = labels.with("disk", "/var");

        assert_eq!(labels.len(), 2);
        assert_eq!(extended.len(), 3);
        assert_eq!(labels.format(), "{hostname=\"h1\", service=\"load\"}");
        assert_eq!(
            extended.format(),
            "{hostname=\"h1\", service=\"load\", disk=\"/var\"}"
        );
    }

    #[test]
    fn test_empty_label_set() {
        assert!(LabelSet::new().is_empty());
        assert_eq!(LabelSet::new().format(), "{}");
    }

    #[test]
    fn test_store_put_and_render() {
        let mut store = MetricStore::new();
        store.put("icinga2_load_load1", &host_labels(), 0.05);
        store.put("icinga2_load_load5", &host_labels(), 0.1);

        assert_eq!(
            store.render(),
            "icinga2_load_load1{hostname=\"h1\", service=\"load\"} 0.05\n\
             icinga2_load_load5{hostname=\"h1\", service=\"load\"} 0.1\n"
        );
    }

    #[test]
    fn test_store_last_write_wins() {
        let mut store = MetricStore::new();
        store.put("m", &host_labels(), 1.0);
        store.put("m", &host_labels(), 2.0);

        assert_eq!(store.len(), 1);
        assert_eq!(store.render(), "m{hostname=\"h1\", service=\"load\"} 2\n");
    }

    #[test]
    fn test_store_distinct_label_values_are_distinct_series() {
        let mut store = MetricStore::new();
        store.put("m", &host_labels().with("disk", "C:"), 50.0);
        store.put("m", &host_labels().with("disk", "D:"), 70.0);

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_store_renders_empty() {
        let store = MetricStore::new();

        assert!(store.is_empty());
        assert_eq!(store.render(), "");
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value("simple"), "simple");
        assert_eq!(escape_label_value("with\"quote"), "with\\\"quote");
        assert_eq!(escape_label_value("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_label_value("with\nnewline"), "with\\nnewline");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(42.0), "42");
        assert_eq!(format_value(3.14), "3.14");
        assert_eq!(format_value(0.00196), "0.00196");
        assert_eq!(format_value(-1.0), "-1");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
    }
}
