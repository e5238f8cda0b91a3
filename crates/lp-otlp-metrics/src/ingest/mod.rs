//! Line protocol → OTLP conversion, one module per schema.

use lp_otlp_core::Number;
use opentelemetry_proto::tonic::{common::v1::KeyValue, metrics::v1::NumberDataPoint};

pub(crate) mod v1;
pub(crate) mod v2;

pub(crate) fn number_point(
    attributes: Vec<KeyValue>,
    start_time_unix_nano: u64,
    time_unix_nano: u64,
    value: Number,
) -> NumberDataPoint {
    NumberDataPoint {
        attributes,
        start_time_unix_nano,
        time_unix_nano,
        exemplars: Vec::new(),
        flags: 0,
        value: Some(value.into()),
    }
}
