//! Reserved measurement, tag and field names shared by both schemas.

/// Tag carrying the instrumentation scope name.
pub const SCOPE_NAME: &str = "otel.library.name";
/// Tag carrying the instrumentation scope version.
pub const SCOPE_VERSION: &str = "otel.library.version";

/// V1 field holding a gauge value.
pub const GAUGE_FIELD: &str = "gauge";
/// V1 field holding a counter value.
pub const COUNTER_FIELD: &str = "counter";
/// V1 field holding a histogram or summary observation count.
pub const COUNT_FIELD: &str = "count";
/// V1 field holding a histogram or summary observation sum.
pub const SUM_FIELD: &str = "sum";

/// Start time of a statsd delta counter, RFC3339 or unix nanoseconds.
pub const START_TIME_FIELD: &str = "start_time";
/// Tag selecting the aggregation temporality of a V1 counter.
pub const TEMPORALITY_TAG: &str = "temporality";
/// Value of [`TEMPORALITY_TAG`] selecting delta temporality.
pub const TEMPORALITY_DELTA: &str = "delta";

/// The only measurement name accepted and produced by the V2 schema.
pub const PROMETHEUS_MEASUREMENT: &str = "prometheus";
/// V2 tag holding a histogram bucket upper bound.
pub const BUCKET_BOUND_TAG: &str = "le";
/// V2 tag holding a summary quantile.
pub const QUANTILE_TAG: &str = "quantile";
/// V2 suffix of a histogram bucket count field.
pub const BUCKET_SUFFIX: &str = "_bucket";
/// V2 suffix of a histogram/summary count field.
pub const COUNT_SUFFIX: &str = "_count";
/// V2 suffix of a histogram/summary sum field.
pub const SUM_SUFFIX: &str = "_sum";
/// Bound of the overflow bucket as written by the V2 schema.
pub const INF_BOUND: &str = "+Inf";
