//! Line-protocol point model and the leaf conversions shared by the metric schemas.
//!
//! This crate knows how a flat point (measurement, tags, fields, timestamp) is typed,
//! how its values coerce into OTLP numbers, and how its tags split across the OTLP
//! resource / instrumentation scope / data point hierarchy.

mod config;
pub mod convert;
mod error;
pub mod keys;
mod point;
pub mod tags;
pub mod time;
mod value;

pub use config::{ConverterConfig, Schema};
pub use error::Error;
pub use point::{Point, ValueType};
pub use value::{format_numeric_key, parse_numeric_key, FieldValue, Number};
