//! Assembly of one histogram or summary data point from several line-protocol points.

use opentelemetry_proto::tonic::metrics::v1::{
    summary_data_point::ValueAtQuantile, HistogramDataPoint, SummaryDataPoint,
};

use crate::metric::{attribute_set::SeriesKey, buckets::cumulative_to_per_bucket};

/// A contribution of a single V2 line to a data point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// `le=<bound>` with the cumulative count of observations at or below it.
    Bucket { bound: f64, count: u64 },
    /// `quantile=<q>` with the value at that quantile.
    Quantile { quantile: f64, value: f64 },
    /// The `_count` and `_sum` line.
    CountSum { count: u64, sum: f64 },
}

/// A data point under construction.
///
/// Bucket and quantile payloads are kept apart; which one becomes the output is decided
/// when the batch finishes.
#[derive(Debug, Clone)]
pub struct PointAccumulator {
    key: SeriesKey,
    count: Option<u64>,
    sum: Option<f64>,
    buckets: Vec<(f64, u64)>,
    quantiles: Vec<(f64, f64)>,
}

impl PointAccumulator {
    pub fn new(key: SeriesKey) -> Self {
        Self {
            key,
            count: None,
            sum: None,
            buckets: Vec::new(),
            quantiles: Vec::new(),
        }
    }

    /// Merges one line into the data point. Later values for the same bound,
    /// quantile or count/sum replace earlier ones.
    pub fn join(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Bucket { bound, count } => {
                upsert(&mut self.buckets, bound, count, "bucket bound")
            }
            Contribution::Quantile { quantile, value } => {
                upsert(&mut self.quantiles, quantile, value, "quantile")
            }
            Contribution::CountSum { count, sum } => {
                if self.count.is_some() {
                    tracing::debug!(count, sum, "replacing histogram count and sum");
                }
                self.count = Some(count);
                self.sum = Some(sum);
            }
        }
    }

    pub fn has_quantiles(&self) -> bool {
        !self.quantiles.is_empty()
    }

    pub fn has_buckets(&self) -> bool {
        !self.buckets.is_empty()
    }

    /// Builds the histogram form: sorted finite bounds and per-bucket counts with the
    /// overflow bucket last.
    pub fn to_histogram_point(&self) -> HistogramDataPoint {
        let mut buckets = self.buckets.clone();
        buckets.sort_by(|l, r| l.0.total_cmp(&r.0));
        let mut overflow = None;
        let mut explicit_bounds = Vec::with_capacity(buckets.len());
        let mut counts = Vec::with_capacity(buckets.len() + 1);
        for (bound, count) in buckets {
            if bound == f64::INFINITY {
                overflow = Some(count);
            } else if bound.is_finite() {
                explicit_bounds.push(bound);
                counts.push(count);
            } else {
                tracing::debug!(bound, "skipping non-finite histogram bucket bound");
            }
        }
        let count = self
            .count
            .or(overflow)
            .or(counts.last().copied())
            .unwrap_or_default();
        if !counts.is_empty() || overflow.is_some() {
            counts.push(count);
            cumulative_to_per_bucket(&mut counts);
        }
        HistogramDataPoint {
            attributes: self.key.attributes.to_otlp_attributes(),
            start_time_unix_nano: 0,
            time_unix_nano: self.key.time_unix_nano,
            count,
            sum: self.sum,
            bucket_counts: counts,
            explicit_bounds,
            exemplars: Vec::new(),
            flags: 0,
            min: None,
            max: None,
        }
    }

    /// Builds the summary form with quantiles in ascending order.
    pub fn to_summary_point(&self) -> SummaryDataPoint {
        if self.has_buckets() {
            tracing::debug!(
                buckets = self.buckets.len(),
                "dropping histogram buckets of a summary data point"
            );
        }
        let mut quantiles = self.quantiles.clone();
        quantiles.sort_by(|l, r| l.0.total_cmp(&r.0));
        SummaryDataPoint {
            attributes: self.key.attributes.to_otlp_attributes(),
            start_time_unix_nano: 0,
            time_unix_nano: self.key.time_unix_nano,
            count: self.count.unwrap_or_default(),
            sum: self.sum.unwrap_or_default(),
            quantile_values: quantiles
                .into_iter()
                .map(|(quantile, value)| ValueAtQuantile { quantile, value })
                .collect(),
            flags: 0,
        }
    }
}

fn upsert<V: Copy + std::fmt::Debug>(
    entries: &mut Vec<(f64, V)>,
    key: f64,
    value: V,
    what: &'static str,
) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => {
            tracing::debug!(key, ?value, "replacing histogram {what}");
            entry.1 = value;
        }
        None => entries.push((key, value)),
    }
}
