//! Rendering of the status line.

use std::collections::BTreeMap;

use crate::table::ValuePoint;
use crate::threshold::Thresholds;
use crate::{PerfDatum, Unit};

const BYTE_SUFFIXES: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// Builds the label that prefixes the status line, e.g. `CPU_USAGE_USER_CPU_CPU-TOTAL`.
pub fn identifier(measurement: &str, fields: &[String], tags: &BTreeMap<String, String>) -> String {
    let mut parts = vec![measurement];
    parts.extend(fields.iter().map(String::as_str));
    for (key, value) in tags {
        parts.push(key.as_str());
        parts.push(value.as_str());
    }

    parts.join("_").to_uppercase()
}

/// Renders the extracted values as `field=value` pairs separated by commas.
pub fn describe(points: &[ValuePoint], bytes: bool) -> String {
    points
        .iter()
        .map(|point| {
            let value = if bytes {
                format_bytes(point.value)
            } else {
                point.value.to_string()
            };
            format!("{}={}", point.field, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Performance data for every value, carrying the thresholds.
pub fn perf_data(points: &[ValuePoint], thresholds: &Thresholds, bytes: bool) -> Vec<PerfDatum> {
    let unit = if bytes { Unit::Bytes } else { Unit::None };

    points
        .iter()
        .map(|point| PerfDatum {
            label: point.field.clone(),
            value: point.value,
            unit,
            warning: Some(thresholds.warning),
            critical: Some(thresholds.critical),
        })
        .collect()
}

/// Human readable byte count with base-1024 suffixes: `512`, `1.5K`, `10M`.
///
/// Values below ten keep one decimal once a suffix is used.
pub fn format_bytes(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let mut n = value.abs();
    let mut suffix = 0;

    while n >= 1024.0 && suffix < BYTE_SUFFIXES.len() - 1 {
        n /= 1024.0;
        suffix += 1;
    }

    // rounding may carry into the next unit, e.g. 1023.7 or 1023.7K
    if suffix < BYTE_SUFFIXES.len() - 1 && format!("{n:.0}") == "1024" {
        n /= 1024.0;
        suffix += 1;
    }

    if suffix > 0 && n < 9.95 {
        format!("{sign}{n:.1}{}", BYTE_SUFFIXES[suffix])
    } else {
        format!("{sign}{n:.0}{}", BYTE_SUFFIXES[suffix])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdMode;

    #[test]
    fn test_identifier() {
        let mut tags = BTreeMap::new();
        assert_eq!(
            identifier("cpu", &["usage_user".to_owned()], &tags),
            "CPU_USAGE_USER"
        );

        tags.insert("cpu".to_owned(), "cpu-total".to_owned());
        assert_eq!(
            identifier("cpu", &["usage_user".to_owned(), "usage_system".to_owned()], &tags),
            "CPU_USAGE_USER_USAGE_SYSTEM_CPU_CPU-TOTAL"
        );
    }

    #[test]
    fn test_describe() {
        let points = vec![ValuePoint::new("rx", 10.0), ValuePoint::new("tx", 30.25)];
        assert_eq!(describe(&points, false), "rx=10, tx=30.25");

        let points = vec![ValuePoint::new("used", 1536.0)];
        assert_eq!(describe(&points, true), "used=1.5K");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0");
        assert_eq!(format_bytes(512.0), "512");
        assert_eq!(format_bytes(1024.0), "1.0K");
        assert_eq!(format_bytes(1536.0), "1.5K");
        assert_eq!(format_bytes(10.0 * 1024.0 * 1024.0), "10M");
        assert_eq!(format_bytes(2.0 * 1024.0 * 1024.0 * 1024.0), "2.0G");
        assert_eq!(format_bytes(1023.9 * 1024.0), "1.0M");
        assert_eq!(format_bytes(1023.4), "1023");
        assert_eq!(format_bytes(1023.6), "1.0K");
        assert_eq!(format_bytes(-2048.0), "-2.0K");
    }

    #[test]
    fn test_perf_data() {
        let thresholds = Thresholds {
            warning: 20.0,
            critical: 25.0,
            mode: ThresholdMode::Each,
        };
        let points = vec![ValuePoint::new("used", 2048.0)];

        let data = perf_data(&points, &thresholds, true);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].to_string(), "used=2048B;20;25");
    }
}
