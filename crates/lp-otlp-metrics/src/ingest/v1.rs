//! Telegraf/Prometheus V1 ingestion.
//!
//! The measurement is the metric name and one point carries a whole observation:
//! `gauge` or `counter` for numbers, `count`, `sum` and one field per bucket bound or
//! quantile for histograms and summaries.

use std::collections::BTreeMap;

use lp_otlp_core::{
    keys::{
        COUNTER_FIELD, COUNT_FIELD, GAUGE_FIELD, START_TIME_FIELD, SUM_FIELD, TEMPORALITY_DELTA,
        TEMPORALITY_TAG,
    },
    parse_numeric_key,
    tags::split_tags,
    time, FieldValue, Number, Point, ValueType,
};
use opentelemetry_proto::tonic::metrics::v1::{
    summary_data_point::ValueAtQuantile, AggregationTemporality, HistogramDataPoint,
    SummaryDataPoint,
};

use crate::{
    ingest::number_point,
    metric::{
        attribute_set::AttributeSet, buckets::cumulative_to_per_bucket, MetricKind, MetricsBatch,
    },
    Error,
};

/// Infers the metric type of a V1 point from its field names.
///
/// Histograms and summaries look identical here; both are reported as histograms.
pub(crate) fn infer_value_type(hint: ValueType, fields: &BTreeMap<String, FieldValue>) -> ValueType {
    if hint != ValueType::Untyped {
        return hint;
    }
    if fields.contains_key(GAUGE_FIELD) {
        return ValueType::Gauge;
    }
    if fields.contains_key(COUNTER_FIELD) {
        return ValueType::Sum;
    }
    let looks_like_histogram = fields.keys().any(|k| {
        k == COUNT_FIELD || k == SUM_FIELD || parse_numeric_key(k).is_some_and(f64::is_finite)
    });
    if looks_like_histogram {
        ValueType::Histogram
    } else {
        ValueType::Untyped
    }
}

pub(crate) fn add_point(batch: &mut MetricsBatch, mut point: Point) -> Result<(), Error> {
    let ts = time::or_now(point.timestamp);
    match infer_value_type(point.value_type, &point.fields) {
        ValueType::Gauge | ValueType::Untyped => {
            convert_number(batch, &point, ts, GAUGE_FIELD, MetricKind::Gauge, 0)
        }
        ValueType::Sum => {
            let temporality = match point.tags.remove(TEMPORALITY_TAG).as_deref() {
                Some(TEMPORALITY_DELTA) => AggregationTemporality::Delta,
                _ => AggregationTemporality::Cumulative,
            };
            let start_time = point
                .fields
                .get(START_TIME_FIELD)
                .map_or(0, |value| match time::parse_start_time(value) {
                    Ok(start_time) => start_time,
                    Err(e) => {
                        tracing::debug!(metric = %point.measurement, error = %e, "ignoring start time");
                        0
                    }
                });
            let kind = MetricKind::Sum {
                temporality,
                is_monotonic: true,
            };
            convert_number(batch, &point, ts, COUNTER_FIELD, kind, start_time)
        }
        ValueType::Histogram => convert_histogram(batch, &point, ts),
        ValueType::Summary => convert_summary(batch, &point, ts),
    }
}

/// Converts a gauge or counter point.
///
/// Without `value_field`, every numeric field becomes its own metric named
/// `<measurement>_<field>`.
fn convert_number(
    batch: &mut MetricsBatch,
    point: &Point,
    ts: u64,
    value_field: &str,
    kind: MetricKind,
    start_time: u64,
) -> Result<(), Error> {
    let tags = split_tags(&point.tags);
    let attributes = AttributeSet::from(&tags.attributes).to_otlp_attributes();

    if let Some(value) = point.fields.get(value_field) {
        let number = value.to_number(value_field)?;
        batch
            .lookup_metric(&tags, &point.measurement, kind)?
            .push_number(number_point(attributes, start_time, ts, number));
        return Ok(());
    }

    let numbers: Vec<(String, Number)> = point
        .fields
        .iter()
        .filter(|(key, _)| key.as_str() != START_TIME_FIELD)
        .filter_map(|(key, value)| {
            if key.is_empty() {
                tracing::debug!(metric = %point.measurement, "dropping field with empty key");
                return None;
            }
            match value.to_number(key) {
                Ok(number) => Some((format!("{}_{}", point.measurement, key), number)),
                Err(e) => {
                    tracing::debug!(metric = %point.measurement, field = %key, error = %e, "dropping field");
                    None
                }
            }
        })
        .collect();
    if numbers.is_empty() {
        return Err(Error::NoNumericFields(point.measurement.clone()));
    }

    let mut written = 0;
    let mut first_err = None;
    for (name, number) in numbers {
        match batch.lookup_metric(&tags, &name, kind) {
            Ok(data) => {
                data.push_number(number_point(attributes.clone(), start_time, ts, number));
                written += 1;
            }
            Err(e) => {
                tracing::debug!(metric = %name, error = %e, "dropping field");
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) if written == 0 => Err(e),
        _ => Ok(()),
    }
}

fn missing(metric: &str, kind: &'static str, field: &'static str) -> Error {
    Error::MissingField {
        metric: metric.to_owned(),
        kind,
        field,
    }
}

fn convert_histogram(batch: &mut MetricsBatch, point: &Point, ts: u64) -> Result<(), Error> {
    let metric = &point.measurement;
    let mut count = None;
    let mut sum = None;
    let mut buckets = Vec::new();
    for (key, value) in &point.fields {
        match key.as_str() {
            COUNT_FIELD => count = Some(value.to_u64(key)?),
            SUM_FIELD => sum = Some(value.to_f64(key)?),
            START_TIME_FIELD => {}
            _ => match parse_numeric_key(key) {
                Some(bound) if bound.is_finite() => buckets.push((bound, value.to_u64(key)?)),
                // The overflow bucket always comes from `count`.
                Some(bound) if bound == f64::INFINITY => {}
                _ => tracing::debug!(metric = %metric, field = %key, "skipping unrecognized histogram field"),
            },
        }
    }
    let count = count.ok_or_else(|| missing(metric, "histogram", COUNT_FIELD))?;
    let sum = sum.ok_or_else(|| missing(metric, "histogram", SUM_FIELD))?;

    buckets.sort_by(|l, r| l.0.total_cmp(&r.0));
    if let Some(w) = buckets.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(Error::DuplicateBound {
            metric: metric.clone(),
            bound: w[0].0,
        });
    }
    let explicit_bounds: Vec<f64> = buckets.iter().map(|(bound, _)| *bound).collect();
    let mut bucket_counts: Vec<u64> = buckets
        .iter()
        .map(|(_, c)| *c)
        .chain(std::iter::once(count))
        .collect();
    cumulative_to_per_bucket(&mut bucket_counts);

    let tags = split_tags(&point.tags);
    let data_point = HistogramDataPoint {
        attributes: AttributeSet::from(&tags.attributes).to_otlp_attributes(),
        start_time_unix_nano: 0,
        time_unix_nano: ts,
        count,
        sum: Some(sum),
        bucket_counts,
        explicit_bounds,
        exemplars: Vec::new(),
        flags: 0,
        min: None,
        max: None,
    };
    batch
        .lookup_metric(&tags, metric, MetricKind::Histogram)?
        .push_histogram(data_point);
    Ok(())
}

fn convert_summary(batch: &mut MetricsBatch, point: &Point, ts: u64) -> Result<(), Error> {
    let metric = &point.measurement;
    let mut count = None;
    let mut sum = None;
    let mut quantiles = Vec::new();
    for (key, value) in &point.fields {
        match key.as_str() {
            COUNT_FIELD => count = Some(value.to_u64(key)?),
            SUM_FIELD => sum = Some(value.to_f64(key)?),
            START_TIME_FIELD => {}
            _ => match parse_numeric_key(key) {
                Some(quantile) if quantile.is_finite() => quantiles.push(ValueAtQuantile {
                    quantile,
                    value: value.to_f64(key)?,
                }),
                _ => tracing::debug!(metric = %metric, field = %key, "skipping unrecognized summary field"),
            },
        }
    }
    let count = count.ok_or_else(|| missing(metric, "summary", COUNT_FIELD))?;
    let sum = sum.ok_or_else(|| missing(metric, "summary", SUM_FIELD))?;
    quantiles.sort_by(|l, r| l.quantile.total_cmp(&r.quantile));

    let tags = split_tags(&point.tags);
    let data_point = SummaryDataPoint {
        attributes: AttributeSet::from(&tags.attributes).to_otlp_attributes(),
        start_time_unix_nano: 0,
        time_unix_nano: ts,
        count,
        sum,
        quantile_values: quantiles,
        flags: 0,
    };
    batch
        .lookup_metric(&tags, metric, MetricKind::Summary)?
        .push_summary(data_point);
    Ok(())
}
