//! Builders and lookups shared by the unit tests.

use std::collections::BTreeMap;

use lp_otlp_core::{convert::any_value_to_tag, keys::PROMETHEUS_MEASUREMENT, Point, Schema};
use opentelemetry_proto::tonic::{
    common::v1::KeyValue,
    metrics::v1::{
        metric::Data, number_data_point::Value, Gauge, Histogram, Metric, NumberDataPoint,
        ResourceMetrics, Sum, Summary,
    },
};

use crate::Converter;

/// Ingests all points into one batch, failing the test on any conversion error.
pub fn ingest(schema: Schema, points: impl IntoIterator<Item = Point>) -> Vec<ResourceMetrics> {
    let mut batch = Converter::new(schema).new_batch();
    for point in points {
        let desc = format!("{point:?}");
        if let Err(e) = batch.add_point(point) {
            panic!("failed to add {desc}: {e}");
        }
    }
    batch.finish()
}

/// A V2 point with the reserved measurement name.
pub fn prometheus() -> Point {
    Point::new(PROMETHEUS_MEASUREMENT)
}

pub fn find_metric<'a>(rms: &'a [ResourceMetrics], name: &str) -> Option<&'a Metric> {
    rms.iter()
        .flat_map(|rm| &rm.scope_metrics)
        .flat_map(|sm| &sm.metrics)
        .find(|m| m.name == name)
}

pub fn attributes(kvs: &[KeyValue]) -> BTreeMap<String, String> {
    kvs.iter()
        .filter_map(|kv| {
            let value = kv.value.as_ref().and_then(any_value_to_tag)?;
            Some((kv.key.clone(), value))
        })
        .collect()
}

pub fn resource_attributes(rm: &ResourceMetrics) -> BTreeMap<String, String> {
    rm.resource
        .as_ref()
        .map(|r| attributes(&r.attributes))
        .unwrap_or_default()
}

pub fn gauge_points(metric: &Metric) -> &[NumberDataPoint] {
    match &metric.data {
        Some(Data::Gauge(gauge)) => &gauge.data_points,
        other => panic!("expected gauge for {}, got {other:?}", metric.name),
    }
}

pub fn sum(metric: &Metric) -> &Sum {
    match &metric.data {
        Some(Data::Sum(sum)) => sum,
        other => panic!("expected sum for {}, got {other:?}", metric.name),
    }
}

pub fn histogram(metric: &Metric) -> &Histogram {
    match &metric.data {
        Some(Data::Histogram(histogram)) => histogram,
        other => panic!("expected histogram for {}, got {other:?}", metric.name),
    }
}

pub fn summary(metric: &Metric) -> &Summary {
    match &metric.data {
        Some(Data::Summary(summary)) => summary,
        other => panic!("expected summary for {}, got {other:?}", metric.name),
    }
}

pub fn number_point(time_unix_nano: u64, value: f64) -> NumberDataPoint {
    NumberDataPoint {
        time_unix_nano,
        value: Some(Value::AsDouble(value)),
        ..Default::default()
    }
}

pub fn gauge_metric(name: &str, data_points: Vec<NumberDataPoint>) -> Metric {
    Metric {
        name: name.to_owned(),
        data: Some(Data::Gauge(Gauge { data_points })),
        ..Default::default()
    }
}
