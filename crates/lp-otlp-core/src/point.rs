//! The flat line-protocol point shared by both conversion directions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FieldValue;

/// Out-of-band metric type hint carried by some producers (statsd, the OTLP exporter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Untyped,
    Gauge,
    Sum,
    Histogram,
    Summary,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Untyped => "untyped",
            ValueType::Gauge => "gauge",
            ValueType::Sum => "sum",
            ValueType::Histogram => "histogram",
            ValueType::Summary => "summary",
        })
    }
}

/// A measurement name, string tags, typed fields and a nanosecond timestamp.
///
/// Tag and field keys are unique. A timestamp of zero means the producer did not set one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub value_type: ValueType,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            ..Default::default()
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn timestamp(mut self, unix_nano: u64) -> Self {
        self.timestamp = unix_nano;
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_from_json() {
        let point: Point = serde_json::from_str(
            r#"{"measurement":"cpu","tags":{"host.name":"a"},"fields":{"gauge":1.5},"timestamp":10,"value_type":"gauge"}"#,
        )
        .unwrap();
        assert_eq!(
            point,
            Point::new("cpu")
                .tag("host.name", "a")
                .field("gauge", 1.5)
                .timestamp(10)
                .value_type(ValueType::Gauge)
        );
    }

    #[test]
    fn test_point_defaults() {
        let point: Point = serde_json::from_str(r#"{"measurement":"cpu"}"#).unwrap();
        assert_eq!(point.value_type, ValueType::Untyped);
        assert_eq!(point.timestamp, 0);
        assert!(point.tags.is_empty());
    }
}
