//! Normalization of Nagios plugin units of measurement.
//!
//! Values are converted to the Prometheus base units: seconds for time,
//! bytes for sizes and a 0..1 ratio for percentages. Byte multiples use
//! base 1024 since the plugin guidelines don't tell `KB` from `KiB`.

use std::fmt;

/// Canonical unit of a normalized measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Unit {
    Ratio,
    Seconds,
    Bytes,
    /// Unknown or missing unit of measurement.
    #[default]
    Unitless,
}

impl Unit {
    /// Suffix used in metric names; empty for [`Unit::Unitless`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Ratio => "ratio",
            Unit::Seconds => "seconds",
            Unit::Bytes => "bytes",
            Unit::Unitless => "",
        }
    }

    pub fn is_unitless(&self) -> bool {
        matches!(self, Unit::Unitless)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const KIB: f64 = 1024.0;

/// Convert a raw value and its unit token to a canonical value and unit.
///
/// Unrecognized tokens (including the counter unit `c`) leave the value
/// untouched and yield [`Unit::Unitless`].
pub fn normalize(value: f64, unit: &str) -> (f64, Unit) {
    match unit {
        "%" => (value / 100.0, Unit::Ratio),
        "s" => (value, Unit::Seconds),
        "ms" => (value / 1_000.0, Unit::Seconds),
        "us" => (value / 1_000_000.0, Unit::Seconds),
        "B" => (value, Unit::Bytes),
        "KB" => (value * KIB, Unit::Bytes),
        "MB" => (value * KIB * KIB, Unit::Bytes),
        "GB" => (value * KIB * KIB * KIB, Unit::Bytes),
        "TB" => (value * KIB * KIB * KIB * KIB, Unit::Bytes),
        _ => (value, Unit::Unitless),
    }
}
