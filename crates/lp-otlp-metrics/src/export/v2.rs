//! Telegraf/Prometheus V2 export.
//!
//! All points use the `prometheus` measurement. Histograms and summaries expand into a
//! `_count`/`_sum` point plus one point per bucket bound or quantile.

use lp_otlp_core::{
    format_numeric_key,
    keys::{
        BUCKET_BOUND_TAG, BUCKET_SUFFIX, COUNT_SUFFIX, INF_BOUND, PROMETHEUS_MEASUREMENT,
        QUANTILE_TAG, SUM_SUFFIX,
    },
    Number, Point, ValueType,
};
use opentelemetry_proto::tonic::{
    common::v1::KeyValue,
    metrics::v1::{Gauge, Histogram, Sum, Summary},
};

use crate::{
    export::{cumulative_bucket_counts, number_value, require_cumulative, MetricContext},
    Error,
};

fn prometheus_point(
    ctx: MetricContext<'_>,
    attributes: &[KeyValue],
    ts: u64,
    value_type: ValueType,
) -> Point {
    Point {
        measurement: PROMETHEUS_MEASUREMENT.to_owned(),
        tags: ctx.tags(attributes),
        fields: Default::default(),
        timestamp: ts,
        value_type,
    }
}

pub fn gauge_points(
    ctx: MetricContext<'_>,
    metric: &str,
    gauge: &Gauge,
) -> Result<Vec<Point>, Error> {
    gauge
        .data_points
        .iter()
        .map(|dp| {
            let value = Number::from(number_value(metric, dp)?);
            Ok(
                prometheus_point(ctx, &dp.attributes, dp.time_unix_nano, ValueType::Gauge)
                    .field(metric, value),
            )
        })
        .collect()
}

/// Only cumulative monotonic sums have a V2 representation.
pub fn sum_points(ctx: MetricContext<'_>, metric: &str, sum: &Sum) -> Result<Vec<Point>, Error> {
    require_cumulative(metric, sum.aggregation_temporality)?;
    if !sum.is_monotonic {
        return Err(Error::NonMonotonicSum(metric.to_owned()));
    }
    sum.data_points
        .iter()
        .map(|dp| {
            let value = Number::from(number_value(metric, dp)?);
            Ok(
                prometheus_point(ctx, &dp.attributes, dp.time_unix_nano, ValueType::Sum)
                    .field(metric, value),
            )
        })
        .collect()
}

pub fn histogram_points(
    ctx: MetricContext<'_>,
    metric: &str,
    histogram: &Histogram,
) -> Result<Vec<Point>, Error> {
    require_cumulative(metric, histogram.aggregation_temporality)?;
    let bucket_field = format!("{metric}{BUCKET_SUFFIX}");
    let mut points = Vec::new();
    for dp in &histogram.data_points {
        let cumulative = cumulative_bucket_counts(metric, &dp.bucket_counts, &dp.explicit_bounds)?;
        let line = || prometheus_point(ctx, &dp.attributes, dp.time_unix_nano, ValueType::Histogram);

        points.push(
            line()
                .field(format!("{metric}{COUNT_SUFFIX}"), dp.count as f64)
                .field(format!("{metric}{SUM_SUFFIX}"), dp.sum.unwrap_or_default()),
        );

        if dp.bucket_counts.is_empty() {
            continue;
        }
        for (bound, count) in dp.explicit_bounds.iter().zip(cumulative) {
            points.push(
                line()
                    .tag(BUCKET_BOUND_TAG, format_numeric_key(*bound))
                    .field(bucket_field.as_str(), count as f64),
            );
        }
        points.push(
            line()
                .tag(BUCKET_BOUND_TAG, INF_BOUND)
                .field(bucket_field.as_str(), dp.count as f64),
        );
    }
    Ok(points)
}

pub fn summary_points(
    ctx: MetricContext<'_>,
    metric: &str,
    summary: &Summary,
) -> Result<Vec<Point>, Error> {
    let mut points = Vec::new();
    for dp in &summary.data_points {
        let line = || prometheus_point(ctx, &dp.attributes, dp.time_unix_nano, ValueType::Summary);
        points.push(
            line()
                .field(format!("{metric}{COUNT_SUFFIX}"), dp.count as f64)
                .field(format!("{metric}{SUM_SUFFIX}"), dp.sum),
        );
        points.extend(dp.quantile_values.iter().map(|q| {
            line()
                .tag(QUANTILE_TAG, format_numeric_key(q.quantile))
                .field(metric, q.value)
        }));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ingest, prometheus};
    use crate::Converter;
    use lp_otlp_core::{FieldValue, Schema};
    use opentelemetry_proto::tonic::metrics::v1::{
        number_data_point::Value, AggregationTemporality, NumberDataPoint, ResourceMetrics,
    };
    use std::collections::BTreeMap;

    const TS: u64 = 1_395_066_363_000_000_123;

    fn export(rms: &[ResourceMetrics]) -> Vec<Point> {
        let mut points = Vec::new();
        Converter::new(Schema::TelegrafPrometheusV2)
            .write_metrics(rms, &mut points)
            .unwrap();
        points
    }

    // Compares point sets ignoring order and type hints.
    fn normalized(points: Vec<Point>) -> Vec<Point> {
        let mut points: Vec<Point> = points
            .into_iter()
            .map(|p| p.value_type(ValueType::Untyped))
            .collect();
        points.sort_by(|l, r| {
            (&l.tags, l.fields.keys().collect::<Vec<_>>())
                .cmp(&(&r.tags, r.fields.keys().collect::<Vec<_>>()))
        });
        points
    }

    fn histogram_lines() -> Vec<Point> {
        let bucket = |le: &str, count: f64| {
            prometheus()
                .tag("path", "/api")
                .tag("le", le)
                .field("http_request_duration_seconds_bucket", count)
                .timestamp(TS)
        };
        vec![
            prometheus()
                .tag("path", "/api")
                .field("http_request_duration_seconds_count", 144320.0)
                .field("http_request_duration_seconds_sum", 53423.0)
                .timestamp(TS),
            bucket("0.05", 24054.0),
            bucket("0.1", 33444.0),
            bucket("0.2", 100392.0),
            bucket("0.5", 129389.0),
            bucket("1", 133988.0),
            bucket("+Inf", 144320.0),
        ]
    }

    #[test]
    fn test_histogram_round_trip() {
        let lines = histogram_lines();
        let rms = ingest(Schema::TelegrafPrometheusV2, lines.clone());
        let exported = export(&rms);
        assert!(exported
            .iter()
            .all(|p| p.value_type == ValueType::Histogram));
        assert_eq!(normalized(exported), normalized(lines));
    }

    #[test]
    fn test_histogram_round_trip_without_overflow_line() {
        let mut lines = histogram_lines();
        lines.pop();
        let rms = ingest(Schema::TelegrafPrometheusV2, lines.clone());
        let exported = export(&rms);
        assert_eq!(exported.len(), lines.len() + 1);
        assert_eq!(
            exported.last().map(|p| p.fields.clone()),
            Some(BTreeMap::from([(
                "http_request_duration_seconds_bucket".to_owned(),
                FieldValue::Float(144320.0)
            )]))
        );
    }

    #[test]
    fn test_bucket_only_histogram_reingests() {
        let bucket = |le: &str, count: f64| {
            prometheus()
                .tag("le", le)
                .field("lat_bucket", count)
                .timestamp(TS)
        };
        let rms = ingest(
            Schema::TelegrafPrometheusV2,
            [bucket("1", 3.0), bucket("+Inf", 5.0)],
        );
        let exported = export(&rms);
        assert_eq!(
            exported[0].fields,
            BTreeMap::from([
                ("lat_count".to_owned(), FieldValue::Float(5.0)),
                ("lat_sum".to_owned(), FieldValue::Float(0.0)),
            ])
        );
        let again = ingest(Schema::TelegrafPrometheusV2, exported);
        assert_eq!(normalized(export(&again)), normalized(export(&rms)));
    }

    #[test]
    fn test_metric_name_ending_in_count_round_trip() {
        let lines = vec![prometheus()
            .field("rpc_count_count", 5.0)
            .field("rpc_count_sum", 2.0)
            .timestamp(TS)];
        let rms = ingest(Schema::TelegrafPrometheusV2, lines.clone());
        assert_eq!(normalized(export(&rms)), normalized(lines));
    }

    #[test]
    fn test_summary_round_trip() {
        let quantile = |q: &str, v: f64| {
            prometheus()
                .tag("quantile", q)
                .field("rpc_duration_seconds", v)
                .timestamp(TS)
        };
        let lines = vec![
            prometheus()
                .field("rpc_duration_seconds_count", 2693.0)
                .field("rpc_duration_seconds_sum", 17560473.0)
                .timestamp(TS),
            quantile("0.01", 3102.0),
            quantile("0.5", 4773.0),
            quantile("0.99", 76656.0),
        ];
        let rms = ingest(Schema::TelegrafPrometheusV2, lines.clone());
        let exported = export(&rms);
        assert!(exported.iter().all(|p| p.value_type == ValueType::Summary));
        assert_eq!(normalized(exported), normalized(lines));
    }

    #[test]
    fn test_gauge_and_sum() {
        let rms = ingest(
            Schema::TelegrafPrometheusV2,
            [
                prometheus().field("go_goroutines", 42i64).timestamp(TS),
                prometheus()
                    .field("http_requests_total", 1027.0)
                    .value_type(ValueType::Sum)
                    .timestamp(TS),
            ],
        );
        let exported = export(&rms);
        assert_eq!(
            exported,
            vec![
                prometheus()
                    .field("go_goroutines", 42i64)
                    .timestamp(TS)
                    .value_type(ValueType::Gauge),
                prometheus()
                    .field("http_requests_total", 1027.0)
                    .timestamp(TS)
                    .value_type(ValueType::Sum),
            ]
        );
    }

    #[test]
    fn test_sum_must_be_cumulative_and_monotonic() {
        let points = vec![NumberDataPoint {
            time_unix_nano: TS,
            value: Some(Value::AsDouble(1.0)),
            ..Default::default()
        }];
        let delta = Sum {
            data_points: points.clone(),
            aggregation_temporality: AggregationTemporality::Delta as i32,
            is_monotonic: true,
        };
        assert!(matches!(
            sum_points(MetricContext::default(), "m", &delta),
            Err(Error::UnsupportedTemporality { .. })
        ));
        let non_monotonic = Sum {
            data_points: points,
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
            is_monotonic: false,
        };
        assert!(matches!(
            sum_points(MetricContext::default(), "m", &non_monotonic),
            Err(Error::NonMonotonicSum(_))
        ));
    }
}
