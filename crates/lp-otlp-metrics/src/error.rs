//! Errors for this crate.

use thiserror::Error;

/// An error converting metrics between line protocol and OTLP.
///
/// Conversion variants reject a single point or metric; the surrounding batch or walk
/// carries on. [`Error::Writer`] comes from the point writer and ends an export walk.
#[derive(Error, Debug)]
pub enum Error {
    /// A field value could not be coerced.
    #[error(transparent)]
    ValueError(#[from] lp_otlp_core::Error),
    #[error("{kind} {field} field not found for metric '{metric}'")]
    MissingField {
        metric: String,
        kind: &'static str,
        field: &'static str,
    },
    #[error("no numeric fields in point '{0}'")]
    NoNumericFields(String),
    #[error("unexpected measurement name '{0}'")]
    UnexpectedMeasurement(String),
    #[error("unable to infer metric type from fields {0:?}")]
    UnknownValueType(Vec<String>),
    #[error("{kind} point should have exactly one field, found {found}")]
    FieldCount { kind: &'static str, found: usize },
    #[error("metric '{metric}' is a {existing}, cannot add a {requested} point")]
    MetricKindConflict {
        metric: String,
        existing: &'static str,
        requested: &'static str,
    },
    #[error("duplicate histogram bucket bound {bound} for metric '{metric}'")]
    DuplicateBound { metric: String, bound: f64 },
    #[error("invalid histogram bucket bound '{0}'")]
    InvalidBucketBound(String),
    #[error("invalid summary quantile '{0}'")]
    InvalidQuantile(String),
    #[error("histogram bucket bound {0} has no matching count")]
    UnpairedBucket(String),
    #[error("summary quantile {0} has no matching value")]
    UnpairedQuantile(String),
    #[error("{field} of metric '{metric}' has no matching {missing}")]
    UnpairedCountSum {
        metric: String,
        field: &'static str,
        missing: &'static str,
    },
    #[error("unsupported aggregation temporality {temporality} for metric '{metric}'")]
    UnsupportedTemporality { metric: String, temporality: i32 },
    #[error("unsupported non-monotonic sum '{0}'")]
    NonMonotonicSum(String),
    #[error("unsupported metric type {kind} for metric '{metric}'")]
    UnsupportedMetricType { metric: String, kind: &'static str },
    #[error("malformed data point for metric '{metric}': {reason}")]
    MalformedDataPoint { metric: String, reason: String },
    /// The point writer rejected a point.
    #[error("point writer failed: {0}")]
    Writer(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    TonicError(#[from] tonic::Status),
    #[error(transparent)]
    TonicTransportError(#[from] tonic::transport::Error),
    #[error(transparent)]
    ArgumentError(#[from] clap::Error),
}

impl Error {
    /// Wraps an error returned by a point writer, keeping writer errors as they are.
    pub fn writer(err: Error) -> Error {
        match err {
            Error::Writer(_) => err,
            other => Error::Writer(Box::new(other)),
        }
    }
}
