//! OTLP → line protocol conversion.
//!
//! A metric is converted in full before any of its points reach the writer, so a
//! conversion error never leaves half a metric behind.

use std::collections::BTreeMap;

use lp_otlp_core::{tags::merge_tags, Point, Schema};
use opentelemetry_proto::tonic::{
    common::v1::{InstrumentationScope, KeyValue},
    metrics::v1::{
        metric::Data, number_data_point, AggregationTemporality, Metric, NumberDataPoint,
        ResourceMetrics,
    },
};

use crate::{writer::PointWriter, Error};

pub mod v1;
pub mod v2;

/// Resource and scope a metric is exported under.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricContext<'a> {
    pub resource: &'a [KeyValue],
    pub scope: Option<&'a InstrumentationScope>,
}

impl MetricContext<'_> {
    /// The flat tag set of one data point.
    pub fn tags(&self, attributes: &[KeyValue]) -> BTreeMap<String, String> {
        merge_tags(self.resource, self.scope, attributes)
    }
}

/// Outcome of an export walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub points_written: usize,
    /// Metrics skipped because they could not be represented in the schema.
    pub metrics_dropped: usize,
}

/// Converts one metric into points without writing them.
pub fn metric_points(
    schema: Schema,
    ctx: MetricContext<'_>,
    metric: &Metric,
) -> Result<Vec<Point>, Error> {
    let name = metric.name.as_str();
    match (&metric.data, schema) {
        (None, _) => Err(malformed(name, "metric has no data")),
        (Some(Data::ExponentialHistogram(_)), _) => Err(Error::UnsupportedMetricType {
            metric: name.to_owned(),
            kind: "exponential histogram",
        }),
        (Some(Data::Gauge(gauge)), Schema::TelegrafPrometheusV1) => {
            v1::gauge_points(ctx, name, gauge)
        }
        (Some(Data::Sum(sum)), Schema::TelegrafPrometheusV1) => v1::sum_points(ctx, name, sum),
        (Some(Data::Histogram(histogram)), Schema::TelegrafPrometheusV1) => {
            v1::histogram_points(ctx, name, histogram)
        }
        (Some(Data::Summary(summary)), Schema::TelegrafPrometheusV1) => {
            v1::summary_points(ctx, name, summary)
        }
        (Some(Data::Gauge(gauge)), Schema::TelegrafPrometheusV2) => {
            v2::gauge_points(ctx, name, gauge)
        }
        (Some(Data::Sum(sum)), Schema::TelegrafPrometheusV2) => v2::sum_points(ctx, name, sum),
        (Some(Data::Histogram(histogram)), Schema::TelegrafPrometheusV2) => {
            v2::histogram_points(ctx, name, histogram)
        }
        (Some(Data::Summary(summary)), Schema::TelegrafPrometheusV2) => {
            v2::summary_points(ctx, name, summary)
        }
    }
}

/// Converts one metric and writes its points.
///
/// Returns the number of points written.
pub fn write_metric<W: PointWriter + ?Sized>(
    schema: Schema,
    ctx: MetricContext<'_>,
    metric: &Metric,
    writer: &mut W,
) -> Result<usize, Error> {
    let points = metric_points(schema, ctx, metric)?;
    write_points(points, writer)
}

/// Walks a metrics tree and writes every representable metric.
///
/// Metrics that fail to convert are logged and counted; a writer error stops the walk.
pub fn write_metrics<W: PointWriter + ?Sized>(
    schema: Schema,
    resource_metrics: &[ResourceMetrics],
    writer: &mut W,
) -> Result<ExportStats, Error> {
    let mut stats = ExportStats::default();
    for rm in resource_metrics {
        let resource = rm
            .resource
            .as_ref()
            .map(|r| r.attributes.as_slice())
            .unwrap_or_default();
        for sm in &rm.scope_metrics {
            let ctx = MetricContext {
                resource,
                scope: sm.scope.as_ref(),
            };
            for metric in &sm.metrics {
                match metric_points(schema, ctx, metric) {
                    Ok(points) => stats.points_written += write_points(points, writer)?,
                    Err(e) => {
                        tracing::debug!(metric = %metric.name, error = %e, "dropping metric");
                        stats.metrics_dropped += 1;
                    }
                }
            }
        }
    }
    Ok(stats)
}

fn write_points<W: PointWriter + ?Sized>(
    points: Vec<Point>,
    writer: &mut W,
) -> Result<usize, Error> {
    let written = points.len();
    for point in points {
        writer.write_point(point).map_err(Error::writer)?;
    }
    Ok(written)
}

pub(crate) fn malformed(metric: &str, reason: impl Into<String>) -> Error {
    Error::MalformedDataPoint {
        metric: metric.to_owned(),
        reason: reason.into(),
    }
}

pub(crate) fn number_value(
    metric: &str,
    point: &NumberDataPoint,
) -> Result<number_data_point::Value, Error> {
    point
        .value
        .clone()
        .ok_or_else(|| malformed(metric, "number data point has no value"))
}

pub(crate) fn require_cumulative(metric: &str, temporality: i32) -> Result<(), Error> {
    if temporality == AggregationTemporality::Cumulative as i32 {
        Ok(())
    } else {
        Err(Error::UnsupportedTemporality {
            metric: metric.to_owned(),
            temporality,
        })
    }
}

/// Cumulative counts of the finite buckets of a histogram data point.
///
/// Valid layouts hold no counts, one per bound, or one per bound plus the overflow.
pub(crate) fn cumulative_bucket_counts(
    metric: &str,
    bucket_counts: &[u64],
    explicit_bounds: &[f64],
) -> Result<Vec<u64>, Error> {
    let bounds = explicit_bounds.len();
    match bucket_counts.len() {
        0 => Ok(Vec::new()),
        n if n == bounds || n == bounds + 1 => Ok(
            crate::metric::buckets::per_bucket_to_cumulative(&bucket_counts[..bounds]),
        ),
        n => Err(malformed(
            metric,
            format!("{n} bucket counts for {bounds} explicit bounds"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{gauge_metric, number_point};
    use lp_otlp_core::convert::string_attribute;
    use opentelemetry_proto::tonic::{
        metrics::v1::{ExponentialHistogram, ScopeMetrics},
        resource::v1::Resource,
    };

    struct FailingWriter {
        accepted: usize,
        limit: usize,
    }

    impl PointWriter for FailingWriter {
        fn write_point(&mut self, _point: Point) -> Result<(), Error> {
            if self.accepted == self.limit {
                return Err(Error::IoError(std::io::Error::other("disk full")));
            }
            self.accepted += 1;
            Ok(())
        }
    }

    fn tree(metrics: Vec<Metric>) -> Vec<ResourceMetrics> {
        vec![ResourceMetrics {
            resource: Some(Resource {
                attributes: vec![string_attribute("host.name", "h1")],
                ..Default::default()
            }),
            scope_metrics: vec![ScopeMetrics {
                scope: Some(InstrumentationScope {
                    name: "io.lib".to_owned(),
                    version: "1.0".to_owned(),
                    ..Default::default()
                }),
                metrics,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }]
    }

    #[test]
    fn test_walker_drops_unconvertible_metrics() -> Result<(), Error> {
        let exponential = Metric {
            name: "latency".to_owned(),
            data: Some(Data::ExponentialHistogram(ExponentialHistogram::default())),
            ..Default::default()
        };
        let empty = Metric {
            name: "nothing".to_owned(),
            ..Default::default()
        };
        let rms = tree(vec![
            exponential,
            gauge_metric("temp", vec![number_point(1, 2.5)]),
            empty,
        ]);
        let mut points = Vec::new();
        let stats = write_metrics(Schema::TelegrafPrometheusV1, &rms, &mut points)?;
        assert_eq!(
            stats,
            ExportStats {
                points_written: 1,
                metrics_dropped: 2
            }
        );
        assert_eq!(points[0].measurement, "temp");
        assert_eq!(
            points[0].tags,
            BTreeMap::from([
                ("host.name".to_owned(), "h1".to_owned()),
                ("otel.library.name".to_owned(), "io.lib".to_owned()),
                ("otel.library.version".to_owned(), "1.0".to_owned()),
            ])
        );
        Ok(())
    }

    #[test]
    fn test_writer_error_stops_walk() {
        let rms = tree(vec![
            gauge_metric("a", vec![number_point(1, 1.0)]),
            gauge_metric("b", vec![number_point(1, 1.0)]),
        ]);
        let mut writer = FailingWriter {
            accepted: 0,
            limit: 1,
        };
        let err = write_metrics(Schema::TelegrafPrometheusV1, &rms, &mut writer).unwrap_err();
        assert!(matches!(err, Error::Writer(_)));
        assert_eq!(writer.accepted, 1);
    }

    #[test]
    fn test_write_metric_reports_conversion_error() {
        let metric = gauge_metric(
            "temp",
            vec![NumberDataPoint {
                time_unix_nano: 1,
                ..Default::default()
            }],
        );
        let mut points = Vec::new();
        let err = write_metric(
            Schema::TelegrafPrometheusV2,
            MetricContext::default(),
            &metric,
            &mut points,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedDataPoint { .. }));
        assert!(points.is_empty());
    }

    #[test]
    fn test_cumulative_bucket_counts() -> Result<(), Error> {
        assert_eq!(
            cumulative_bucket_counts("m", &[1, 2, 3], &[1.0, 2.0])?,
            vec![1, 3]
        );
        assert_eq!(cumulative_bucket_counts("m", &[1, 2], &[1.0, 2.0])?, vec![1, 3]);
        assert!(cumulative_bucket_counts("m", &[], &[1.0])?.is_empty());
        assert!(cumulative_bucket_counts("m", &[1, 2, 3, 4], &[1.0]).is_err());
        Ok(())
    }
}
