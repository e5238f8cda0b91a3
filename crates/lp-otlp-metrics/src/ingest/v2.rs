//! Telegraf/Prometheus V2 ingestion.
//!
//! Every point has the measurement `prometheus` and the field key names the metric.
//! Histograms and summaries are split over several points: one per bucket (`le` tag),
//! one per quantile (`quantile` tag) and one carrying `_count` and `_sum`. Points that
//! share a metric, timestamp and tag set (minus `le`/`quantile`) are joined into one
//! data point by the batch.

use std::collections::BTreeMap;

use lp_otlp_core::{
    keys::{
        BUCKET_BOUND_TAG, BUCKET_SUFFIX, COUNT_SUFFIX, PROMETHEUS_MEASUREMENT, QUANTILE_TAG,
        SUM_SUFFIX,
    },
    parse_numeric_key,
    tags::split_tags,
    time, FieldValue, Point, ValueType,
};
use opentelemetry_proto::tonic::metrics::v1::AggregationTemporality;

use crate::{
    ingest::number_point,
    metric::{
        accumulator::Contribution,
        attribute_set::{AttributeSet, SeriesKey},
        MetricKind, MetricsBatch,
    },
    Error,
};

/// Infers the metric type of a V2 point from its tags and field names.
pub(crate) fn infer_value_type(
    hint: ValueType,
    tags: &BTreeMap<String, String>,
    fields: &BTreeMap<String, FieldValue>,
) -> ValueType {
    if hint != ValueType::Untyped {
        return hint;
    }
    if tags.contains_key(BUCKET_BOUND_TAG) || tags.contains_key(QUANTILE_TAG) {
        return ValueType::Histogram;
    }
    if fields
        .keys()
        .any(|k| k.ends_with(COUNT_SUFFIX) || k.ends_with(SUM_SUFFIX))
    {
        return ValueType::Histogram;
    }
    if fields.len() == 1 {
        ValueType::Gauge
    } else {
        ValueType::Untyped
    }
}

pub(crate) fn add_point(batch: &mut MetricsBatch, mut point: Point) -> Result<(), Error> {
    if point.measurement != PROMETHEUS_MEASUREMENT {
        return Err(Error::UnexpectedMeasurement(point.measurement));
    }
    point.fields.retain(|key, _| {
        if key.is_empty() {
            tracing::debug!("dropping field with empty key");
        }
        !key.is_empty()
    });
    let ts = time::or_now(point.timestamp);
    match infer_value_type(point.value_type, &point.tags, &point.fields) {
        ValueType::Gauge => convert_number(batch, &point, ts, MetricKind::Gauge),
        ValueType::Sum => {
            let kind = MetricKind::Sum {
                temporality: AggregationTemporality::Cumulative,
                is_monotonic: true,
            };
            convert_number(batch, &point, ts, kind)
        }
        ValueType::Histogram => convert_distribution(batch, point, ts, false),
        ValueType::Summary => convert_distribution(batch, point, ts, true),
        ValueType::Untyped => Err(Error::UnknownValueType(
            point.fields.into_keys().collect(),
        )),
    }
}

fn convert_number(
    batch: &mut MetricsBatch,
    point: &Point,
    ts: u64,
    kind: MetricKind,
) -> Result<(), Error> {
    let mut fields = point.fields.iter();
    let (name, value) = match (fields.next(), fields.next()) {
        (Some(field), None) => field,
        _ => {
            return Err(Error::FieldCount {
                kind: if matches!(kind, MetricKind::Gauge) {
                    "gauge"
                } else {
                    "sum"
                },
                found: point.fields.len(),
            })
        }
    };
    let number = value.to_number(name)?;
    let tags = split_tags(&point.tags);
    let attributes = AttributeSet::from(&tags.attributes).to_otlp_attributes();
    batch
        .lookup_metric(&tags, name, kind)?
        .push_number(number_point(attributes, 0, ts, number));
    Ok(())
}

/// Converts one slice of a histogram or summary and joins it into its data point.
fn convert_distribution(
    batch: &mut MetricsBatch,
    point: Point,
    ts: u64,
    prefer_summary: bool,
) -> Result<(), Error> {
    let mut tags = split_tags(&point.tags);
    let bound = tags.attributes.remove(BUCKET_BOUND_TAG);
    let quantile = tags.attributes.remove(QUANTILE_TAG);

    let (metric, contribution) = match (bound, quantile) {
        (Some(bound), _) => bucket_contribution(&point.fields, bound)?,
        (None, Some(quantile)) => quantile_contribution(&point.fields, quantile)?,
        (None, None) => count_sum_contribution(&point.fields)?,
    };

    let key = SeriesKey {
        time_unix_nano: ts,
        attributes: AttributeSet::from(&tags.attributes),
    };
    if let Some(assembly) = batch
        .lookup_metric(&tags, &metric, MetricKind::Assembled { prefer_summary })?
        .assembly()
    {
        assembly.join(key, contribution);
    }
    Ok(())
}

fn bucket_contribution(
    fields: &BTreeMap<String, FieldValue>,
    bound: String,
) -> Result<(String, Contribution), Error> {
    let Some(parsed) = parse_numeric_key(&bound) else {
        return Err(Error::InvalidBucketBound(bound));
    };
    let Some((metric, key, value)) = fields
        .iter()
        .find_map(|(k, v)| Some((k.strip_suffix(BUCKET_SUFFIX)?, k, v)))
    else {
        return Err(Error::UnpairedBucket(bound));
    };
    if fields.len() > 1 {
        tracing::debug!(field = %key, others = fields.len() - 1, "ignoring extra fields on bucket line");
    }
    let count = value.to_u64(key)?;
    Ok((
        metric.to_owned(),
        Contribution::Bucket {
            bound: parsed,
            count,
        },
    ))
}

fn quantile_contribution(
    fields: &BTreeMap<String, FieldValue>,
    quantile: String,
) -> Result<(String, Contribution), Error> {
    let Some(parsed) = parse_numeric_key(&quantile).filter(|q| q.is_finite()) else {
        return Err(Error::InvalidQuantile(quantile));
    };
    let mut iter = fields.iter();
    let (metric, value) = match (iter.next(), iter.next()) {
        (Some(field), None) => field,
        (None, _) => return Err(Error::UnpairedQuantile(quantile)),
        (Some(_), Some(_)) => {
            return Err(Error::FieldCount {
                kind: "quantile",
                found: fields.len(),
            })
        }
    };
    Ok((
        metric.clone(),
        Contribution::Quantile {
            quantile: parsed,
            value: value.to_f64(metric)?,
        },
    ))
}

fn count_sum_contribution(
    fields: &BTreeMap<String, FieldValue>,
) -> Result<(String, Contribution), Error> {
    let counts = fields
        .iter()
        .filter_map(|(k, v)| Some((k.strip_suffix(COUNT_SUFFIX)?, k, v)));
    let mut unpaired_count = None;
    for (metric, count_key, count) in counts {
        let sum_key = format!("{metric}{SUM_SUFFIX}");
        match fields.get(&sum_key) {
            Some(sum) => {
                return Ok((
                    metric.to_owned(),
                    Contribution::CountSum {
                        count: count.to_u64(count_key)?,
                        sum: sum.to_f64(&sum_key)?,
                    },
                ))
            }
            None => {
                unpaired_count.get_or_insert(metric);
            }
        }
    }
    if let Some(metric) = unpaired_count {
        return Err(Error::UnpairedCountSum {
            metric: metric.to_owned(),
            field: COUNT_SUFFIX,
            missing: SUM_SUFFIX,
        });
    }
    match fields.keys().find_map(|k| k.strip_suffix(SUM_SUFFIX)) {
        Some(metric) => Err(Error::UnpairedCountSum {
            metric: metric.to_owned(),
            field: SUM_SUFFIX,
            missing: COUNT_SUFFIX,
        }),
        None => Err(Error::UnknownValueType(fields.keys().cloned().collect())),
    }
}
