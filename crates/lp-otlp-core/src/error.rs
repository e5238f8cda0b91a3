//! Errors for this crate.

use thiserror::Error;

/// A value-level error converting between line-protocol scalars and OTLP.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("unrecognized metrics schema '{0}'")]
    UnknownSchema(String),

    #[error("unsupported {kind} value for field '{field}' in a numeric context")]
    UnsupportedFieldType { field: String, kind: &'static str },

    #[error("field '{field}' value {value} cannot be represented as {target}")]
    NumberOutOfRange {
        field: String,
        value: String,
        target: &'static str,
    },

    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}
