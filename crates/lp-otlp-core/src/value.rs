//! Scalar field values and their coercion into OTLP numbers.

use std::fmt;

use opentelemetry_proto::tonic::metrics::v1::number_data_point;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A typed line-protocol field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bool(bool),
}

/// The numeric representation of an OTLP data point: exactly one of int or double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

impl FieldValue {
    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::UInt(_) => "uint",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Bool(_) => "bool",
        }
    }

    /// True for int, uint and float values.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldValue::Int(_) | FieldValue::UInt(_) | FieldValue::Float(_)
        )
    }

    /// Coerces the value into an OTLP number.
    ///
    /// Unsigned values are reinterpreted as signed, values above `i64::MAX` wrap.
    pub fn to_number(&self, field: &str) -> Result<Number, Error> {
        match self {
            FieldValue::Int(v) => Ok(Number::Int(*v)),
            FieldValue::UInt(v) => Ok(Number::Int(*v as i64)),
            FieldValue::Float(v) => Ok(Number::Double(*v)),
            other => Err(other.unsupported(field)),
        }
    }

    /// Coerces the value into a double.
    pub fn to_f64(&self, field: &str) -> Result<f64, Error> {
        match self {
            FieldValue::Int(v) => Ok(*v as f64),
            FieldValue::UInt(v) => Ok(*v as f64),
            FieldValue::Float(v) => Ok(*v),
            other => Err(other.unsupported(field)),
        }
    }

    /// Coerces the value into an observation count.
    ///
    /// Floats are truncated; negative and non-finite values are rejected.
    pub fn to_u64(&self, field: &str) -> Result<u64, Error> {
        let out_of_range = || Error::NumberOutOfRange {
            field: field.to_owned(),
            value: self.to_string(),
            target: "a count",
        };
        match self {
            FieldValue::UInt(v) => Ok(*v),
            FieldValue::Int(v) => u64::try_from(*v).map_err(|_| out_of_range()),
            FieldValue::Float(v) if v.is_finite() && *v >= 0.0 => Ok(*v as u64),
            FieldValue::Float(_) => Err(out_of_range()),
            other => Err(other.unsupported(field)),
        }
    }

    fn unsupported(&self, field: &str) -> Error {
        Error::UnsupportedFieldType {
            field: field.to_owned(),
            kind: self.kind(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::UInt(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}
impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::UInt(v)
    }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}
impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}
impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}
impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_owned())
    }
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Double(v) => v,
        }
    }
}

impl From<Number> for number_data_point::Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => number_data_point::Value::AsInt(v),
            Number::Double(v) => number_data_point::Value::AsDouble(v),
        }
    }
}

impl From<number_data_point::Value> for Number {
    fn from(v: number_data_point::Value) -> Self {
        match v {
            number_data_point::Value::AsInt(v) => Number::Int(v),
            number_data_point::Value::AsDouble(v) => Number::Double(v),
        }
    }
}

impl From<Number> for FieldValue {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(v) => FieldValue::Int(v),
            Number::Double(v) => FieldValue::Float(v),
        }
    }
}

/// Parses a field key as a bucket bound or quantile.
///
/// Returns `None` for keys that are not numbers at all.
pub fn parse_numeric_key(key: &str) -> Option<f64> {
    key.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Formats a bound or quantile as the shortest string that parses back to it.
pub fn format_numeric_key(v: f64) -> String {
    if v == f64::INFINITY {
        crate::keys::INF_BOUND.to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        format!("{v}")
    }
}
