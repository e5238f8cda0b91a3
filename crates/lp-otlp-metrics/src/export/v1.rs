//! Telegraf/Prometheus V1 export: one point per data point, named after the metric.

use lp_otlp_core::{
    format_numeric_key,
    keys::{
        COUNTER_FIELD, COUNT_FIELD, GAUGE_FIELD, START_TIME_FIELD, SUM_FIELD, TEMPORALITY_DELTA,
        TEMPORALITY_TAG,
    },
    time, Number, Point, ValueType,
};
use opentelemetry_proto::tonic::{
    common::v1::KeyValue,
    metrics::v1::{AggregationTemporality, Gauge, Histogram, Sum, Summary},
};

use crate::{
    export::{cumulative_bucket_counts, number_value, require_cumulative, MetricContext},
    Error,
};

fn base_point(
    ctx: MetricContext<'_>,
    metric: &str,
    attributes: &[KeyValue],
    ts: u64,
    value_type: ValueType,
) -> Point {
    Point {
        measurement: metric.to_owned(),
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
            Ok(base_point(ctx, metric, &dp.attributes, dp.time_unix_nano, ValueType::Gauge)
                .field(GAUGE_FIELD, value))
        })
        .collect()
}

/// Writes a monotonic sum as a `counter` field.
///
/// Delta sums are marked with `temporality=delta` and keep their start time.
pub fn sum_points(ctx: MetricContext<'_>, metric: &str, sum: &Sum) -> Result<Vec<Point>, Error> {
    if !sum.is_monotonic {
        return Err(Error::NonMonotonicSum(metric.to_owned()));
    }
    let delta = match sum.aggregation_temporality {
        t if t == AggregationTemporality::Cumulative as i32 => false,
        t if t == AggregationTemporality::Delta as i32 => true,
        temporality => {
            return Err(Error::UnsupportedTemporality {
                metric: metric.to_owned(),
                temporality,
            })
        }
    };
    sum.data_points
        .iter()
        .map(|dp| {
            let value = Number::from(number_value(metric, dp)?);
            let mut point =
                base_point(ctx, metric, &dp.attributes, dp.time_unix_nano, ValueType::Sum)
                    .field(COUNTER_FIELD, value);
            if delta {
                point = point.tag(TEMPORALITY_TAG, TEMPORALITY_DELTA);
                if dp.start_time_unix_nano != 0 {
                    point = point.field(
                        START_TIME_FIELD,
                        time::format_rfc3339(dp.start_time_unix_nano),
                    );
                }
            }
            Ok(point)
        })
        .collect()
}

/// Writes `count`, `sum` and the cumulative count of every finite bucket, keyed by
/// its upper bound.
pub fn histogram_points(
    ctx: MetricContext<'_>,
    metric: &str,
    histogram: &Histogram,
) -> Result<Vec<Point>, Error> {
    require_cumulative(metric, histogram.aggregation_temporality)?;
    histogram
        .data_points
        .iter()
        .map(|dp| {
            let cumulative = cumulative_bucket_counts(metric, &dp.bucket_counts, &dp.explicit_bounds)?;
            let mut point = base_point(
                ctx,
                metric,
                &dp.attributes,
                dp.time_unix_nano,
                ValueType::Histogram,
            )
            .field(COUNT_FIELD, dp.count as f64)
            .field(SUM_FIELD, dp.sum.unwrap_or_default());
            for (bound, count) in dp.explicit_bounds.iter().zip(cumulative) {
                point = point.field(format_numeric_key(*bound), count as f64);
            }
            Ok(point)
        })
        .collect()
}

pub fn summary_points(
    ctx: MetricContext<'_>,
    metric: &str,
    summary: &Summary,
) -> Result<Vec<Point>, Error> {
    Ok(summary
        .data_points
        .iter()
        .map(|dp| {
            dp.quantile_values.iter().fold(
                base_point(ctx, metric, &dp.attributes, dp.time_unix_nano, ValueType::Summary)
                    .field(COUNT_FIELD, dp.count as f64)
                    .field(SUM_FIELD, dp.sum),
                |point, q| point.field(format_numeric_key(q.quantile), q.value),
            )
        })
        .collect())
}
