//! Deterministic ordering of a metrics tree, for comparing conversion output.
//!
//! Batches keep first-seen order; this is only needed when two trees built from
//! differently ordered input must compare equal.

use std::cmp::Ordering;

use itertools::Itertools;
use lp_otlp_core::convert::any_value_to_tag;
use opentelemetry_proto::tonic::{
    common::v1::KeyValue,
    metrics::v1::{metric::Data, HistogramDataPoint, ResourceMetrics, ScopeMetrics},
};

fn attributes_key(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .map(|kv| {
            let value = kv.value.as_ref().and_then(any_value_to_tag).unwrap_or_default();
            format!("{}={}", kv.key, value)
        })
        .sorted()
        .join(",")
}

fn scope_key(sm: &ScopeMetrics) -> (String, String) {
    sm.scope
        .as_ref()
        .map(|s| (s.name.clone(), s.version.clone()))
        .unwrap_or_default()
}

/// Sorts resources by attributes, scopes by name and version, metrics by name, data
/// points by timestamp and attributes, and summary quantiles ascending.
pub fn sort_resource_metrics(resource_metrics: &mut [ResourceMetrics]) {
    resource_metrics.sort_by_cached_key(|rm| {
        rm.resource
            .as_ref()
            .map(|r| attributes_key(&r.attributes))
            .unwrap_or_default()
    });
    for rm in resource_metrics.iter_mut() {
        rm.scope_metrics.sort_by_cached_key(scope_key);
        for sm in rm.scope_metrics.iter_mut() {
            sm.metrics.sort_by(|l, r| l.name.cmp(&r.name));
            for metric in sm.metrics.iter_mut() {
                sort_data_points(&mut metric.data);
            }
        }
    }
}

fn sort_data_points(data: &mut Option<Data>) {
    match data {
        Some(Data::Gauge(gauge)) => gauge
            .data_points
            .sort_by_cached_key(|p| (p.time_unix_nano, attributes_key(&p.attributes))),
        Some(Data::Sum(sum)) => sum
            .data_points
            .sort_by_cached_key(|p| (p.time_unix_nano, attributes_key(&p.attributes))),
        Some(Data::Histogram(histogram)) => {
            histogram
                .data_points
                .sort_by_cached_key(|p| (p.time_unix_nano, attributes_key(&p.attributes)));
            histogram.data_points.iter_mut().for_each(sort_buckets);
        }
        Some(Data::Summary(summary)) => {
            summary
                .data_points
                .sort_by_cached_key(|p| (p.time_unix_nano, attributes_key(&p.attributes)));
            for p in summary.data_points.iter_mut() {
                p.quantile_values
                    .sort_by(|l, r| l.quantile.total_cmp(&r.quantile));
            }
        }
        Some(Data::ExponentialHistogram(_)) | None => {}
    }
}

// Reorders bounds together with their bucket counts; the overflow count stays last.
fn sort_buckets(point: &mut HistogramDataPoint) {
    let bounds = point.explicit_bounds.len();
    let counts = point.bucket_counts.len();
    if counts != bounds && counts != bounds + 1 {
        return;
    }
    if point
        .explicit_bounds
        .windows(2)
        .all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater)
    {
        return;
    }
    let overflow = (counts == bounds + 1).then(|| point.bucket_counts[bounds]);
    let pairs: Vec<(f64, u64)> = point
        .explicit_bounds
        .iter()
        .copied()
        .zip(point.bucket_counts.iter().copied())
        .sorted_by(|l, r| l.0.total_cmp(&r.0))
        .collect();
    point.explicit_bounds = pairs.iter().map(|(b, _)| *b).collect();
    point.bucket_counts = pairs.iter().map(|(_, c)| *c).chain(overflow).collect();
}
