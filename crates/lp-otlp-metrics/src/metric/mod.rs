//! The metrics batch: an accumulator for the OTLP tree produced from line-protocol points.

use std::collections::{hash_map::Entry, HashMap};

use lp_otlp_core::{tags::SplitTags, Point, Schema};
use opentelemetry_proto::tonic::{
    collector::metrics::v1::ExportMetricsServiceRequest,
    common::v1::InstrumentationScope,
    metrics::v1::{
        metric::Data, AggregationTemporality, Gauge, Histogram, HistogramDataPoint, Metric,
        NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum, Summary, SummaryDataPoint,
    },
    resource::v1::Resource,
};

use crate::{ingest, Error};

pub(crate) mod accumulator;
pub(crate) mod attribute_set;
pub(crate) mod buckets;

use accumulator::{Contribution, PointAccumulator};
use attribute_set::{AttributeSet, SeriesKey};

/// The kind a metric is created with; the first point seen for a name fixes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MetricKind {
    Gauge,
    Sum {
        temporality: AggregationTemporality,
        is_monotonic: bool,
    },
    Histogram,
    Summary,
    /// A histogram or summary assembled from several points.
    Assembled { prefer_summary: bool },
}

impl MetricKind {
    fn name(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Sum {
                temporality: AggregationTemporality::Delta,
                ..
            } => "delta sum",
            MetricKind::Sum { .. } => "cumulative sum",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
            MetricKind::Assembled { .. } => "histogram/summary",
        }
    }
}

/// Data points collected for one metric.
#[derive(Debug)]
pub(crate) enum MetricData {
    Gauge(Vec<NumberDataPoint>),
    Sum {
        temporality: AggregationTemporality,
        is_monotonic: bool,
        data_points: Vec<NumberDataPoint>,
    },
    Histogram(Vec<HistogramDataPoint>),
    Summary(Vec<SummaryDataPoint>),
    Assembled(Assembly),
}

/// In-progress data points of an assembled metric, indexed by series.
#[derive(Debug, Default)]
pub(crate) struct Assembly {
    prefer_summary: bool,
    series: Vec<PointAccumulator>,
    index: HashMap<SeriesKey, usize>,
}

impl Assembly {
    /// Finds or creates the data point for `key` and merges the contribution into it.
    pub fn join(&mut self, key: SeriesKey, contribution: Contribution) {
        let idx = match self.index.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.series.push(PointAccumulator::new(entry.key().clone()));
                *entry.insert(self.series.len() - 1)
            }
        };
        self.series[idx].join(contribution);
    }

    fn into_data(self) -> Data {
        if self.prefer_summary || self.series.iter().any(PointAccumulator::has_quantiles) {
            Data::Summary(Summary {
                data_points: self
                    .series
                    .iter()
                    .map(PointAccumulator::to_summary_point)
                    .collect(),
            })
        } else {
            Data::Histogram(Histogram {
                data_points: self
                    .series
                    .iter()
                    .map(PointAccumulator::to_histogram_point)
                    .collect(),
                aggregation_temporality: AggregationTemporality::Cumulative as i32,
            })
        }
    }
}

impl MetricData {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Gauge => MetricData::Gauge(Vec::new()),
            MetricKind::Sum {
                temporality,
                is_monotonic,
            } => MetricData::Sum {
                temporality,
                is_monotonic,
                data_points: Vec::new(),
            },
            MetricKind::Histogram => MetricData::Histogram(Vec::new()),
            MetricKind::Summary => MetricData::Summary(Vec::new()),
            MetricKind::Assembled { prefer_summary } => MetricData::Assembled(Assembly {
                prefer_summary,
                ..Default::default()
            }),
        }
    }

    fn kind(&self) -> MetricKind {
        match self {
            MetricData::Gauge(_) => MetricKind::Gauge,
            MetricData::Sum {
                temporality,
                is_monotonic,
                ..
            } => MetricKind::Sum {
                temporality: *temporality,
                is_monotonic: *is_monotonic,
            },
            MetricData::Histogram(_) => MetricKind::Histogram,
            MetricData::Summary(_) => MetricKind::Summary,
            MetricData::Assembled(assembly) => MetricKind::Assembled {
                prefer_summary: assembly.prefer_summary,
            },
        }
    }

    /// Checks that a point of `kind` may be added to this metric.
    fn accept(&mut self, metric: &str, kind: MetricKind) -> Result<(), Error> {
        match (self, kind) {
            (MetricData::Assembled(assembly), MetricKind::Assembled { prefer_summary }) => {
                assembly.prefer_summary |= prefer_summary;
                Ok(())
            }
            (existing, requested) if existing.kind() == requested => Ok(()),
            (existing, requested) => Err(Error::MetricKindConflict {
                metric: metric.to_owned(),
                existing: existing.kind().name(),
                requested: requested.name(),
            }),
        }
    }

    /// Appends a gauge or sum data point.
    pub fn push_number(&mut self, point: NumberDataPoint) {
        match self {
            MetricData::Gauge(data_points) | MetricData::Sum { data_points, .. } => {
                data_points.push(point)
            }
            _ => tracing::debug!("dropping number data point on a non-number metric"),
        }
    }

    pub fn push_histogram(&mut self, point: HistogramDataPoint) {
        match self {
            MetricData::Histogram(data_points) => data_points.push(point),
            _ => tracing::debug!("dropping histogram data point on a non-histogram metric"),
        }
    }

    pub fn push_summary(&mut self, point: SummaryDataPoint) {
        match self {
            MetricData::Summary(data_points) => data_points.push(point),
            _ => tracing::debug!("dropping summary data point on a non-summary metric"),
        }
    }

    pub fn assembly(&mut self) -> Option<&mut Assembly> {
        match self {
            MetricData::Assembled(assembly) => Some(assembly),
            _ => None,
        }
    }

    fn into_data(self) -> Data {
        match self {
            MetricData::Gauge(data_points) => Data::Gauge(Gauge { data_points }),
            MetricData::Sum {
                temporality,
                is_monotonic,
                data_points,
            } => Data::Sum(Sum {
                data_points,
                aggregation_temporality: temporality as i32,
                is_monotonic,
            }),
            MetricData::Histogram(data_points) => Data::Histogram(Histogram {
                data_points,
                aggregation_temporality: AggregationTemporality::Cumulative as i32,
            }),
            MetricData::Summary(data_points) => Data::Summary(Summary { data_points }),
            MetricData::Assembled(assembly) => assembly.into_data(),
        }
    }
}

struct MetricEntry {
    name: String,
    data: MetricData,
}

struct ScopeEntry {
    name: String,
    version: String,
    metrics: Vec<MetricEntry>,
    metric_index: HashMap<String, usize>,
}

struct ResourceEntry {
    attributes: AttributeSet,
    scopes: Vec<ScopeEntry>,
    scope_index: HashMap<(String, String), usize>,
}

/// Accumulates line-protocol points into an OTLP metrics tree.
///
/// One batch is used per conversion unit (e.g. one write request) and consumed by
/// [`MetricsBatch::finish`]. Resources, scopes and metrics appear in the order they were
/// first seen. A batch is not meant to be shared between threads while points are added;
/// independent batches need no coordination.
pub struct MetricsBatch {
    schema: Schema,
    resources: Vec<ResourceEntry>,
    resource_index: HashMap<AttributeSet, usize>,
}

impl MetricsBatch {
    pub(crate) fn new(schema: Schema) -> Self {
        Self {
            schema,
            resources: Vec::new(),
            resource_index: HashMap::new(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Converts one point and merges it into the batch.
    ///
    /// An error means this point (or, for fan-out points, all of its fields) was
    /// dropped; the batch stays usable.
    pub fn add_point(&mut self, point: Point) -> Result<(), Error> {
        match self.schema {
            Schema::TelegrafPrometheusV1 => ingest::v1::add_point(self, point),
            Schema::TelegrafPrometheusV2 => ingest::v2::add_point(self, point),
        }
    }

    /// True if no metric has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Looks up the metric `name` under the resource and scope named by `tags`,
    /// creating every missing level.
    pub(crate) fn lookup_metric(
        &mut self,
        tags: &SplitTags,
        name: &str,
        kind: MetricKind,
    ) -> Result<&mut MetricData, Error> {
        let resource_key = AttributeSet::from(&tags.resource);
        let ri = match self.resource_index.entry(resource_key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.resources.push(ResourceEntry {
                    attributes: entry.key().clone(),
                    scopes: Vec::new(),
                    scope_index: HashMap::new(),
                });
                *entry.insert(self.resources.len() - 1)
            }
        };
        let resource = &mut self.resources[ri];

        let scope_key = (tags.scope_name.clone(), tags.scope_version.clone());
        let si = match resource.scope_index.entry(scope_key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let (name, version) = entry.key().clone();
                resource.scopes.push(ScopeEntry {
                    name,
                    version,
                    metrics: Vec::new(),
                    metric_index: HashMap::new(),
                });
                *entry.insert(resource.scopes.len() - 1)
            }
        };
        let scope = &mut resource.scopes[si];

        match scope.metric_index.get(name) {
            Some(&mi) => {
                let data = &mut scope.metrics[mi].data;
                data.accept(name, kind)?;
                Ok(data)
            }
            None => {
                scope.metrics.push(MetricEntry {
                    name: name.to_owned(),
                    data: MetricData::new(kind),
                });
                scope
                    .metric_index
                    .insert(name.to_owned(), scope.metrics.len() - 1);
                let last = scope.metrics.len() - 1;
                Ok(&mut scope.metrics[last].data)
            }
        }
    }

    /// Consumes the batch, returning the accumulated resource metrics.
    pub fn finish(self) -> Vec<ResourceMetrics> {
        self.resources
            .into_iter()
            .map(|resource| ResourceMetrics {
                resource: Some(Resource {
                    attributes: resource.attributes.to_otlp_attributes(),
                    dropped_attributes_count: 0,
                    entity_refs: Vec::new(),
                }),
                scope_metrics: resource
                    .scopes
                    .into_iter()
                    .map(|scope| ScopeMetrics {
                        scope: Some(InstrumentationScope {
                            name: scope.name,
                            version: scope.version,
                            attributes: Vec::new(),
                            dropped_attributes_count: 0,
                        }),
                        metrics: scope
                            .metrics
                            .into_iter()
                            .map(|metric| Metric {
                                name: metric.name,
                                description: String::new(),
                                unit: String::new(),
                                metadata: Vec::new(),
                                data: Some(metric.data.into_data()),
                            })
                            .collect(),
                        schema_url: String::new(),
                    })
                    .collect(),
                schema_url: String::new(),
            })
            .collect()
    }

    /// Consumes the batch into an OTLP export request.
    pub fn into_request(self) -> ExportMetricsServiceRequest {
        ExportMetricsServiceRequest {
            resource_metrics: self.finish(),
        }
    }
}
