//! Conversion of metrics between line-protocol points and the OTLP metrics model.
//!
//! A [`Converter`] is bound to one [`Schema`]. The ingest direction feeds points into
//! a [`MetricsBatch`], which assembles the OTLP resource / scope / metric tree
//! (including histograms and summaries split over several points). The export
//! direction walks an OTLP tree and hands flat points to a [`PointWriter`].

mod error;
pub mod export;
mod ingest;
mod metric;
pub mod sort;
#[cfg(test)]
mod test_utils;
mod writer;

pub use error::Error;
pub use export::{ExportStats, MetricContext};
pub use lp_otlp_core::{ConverterConfig, FieldValue, Point, Schema, ValueType};
pub use metric::MetricsBatch;
pub use writer::PointWriter;

use opentelemetry_proto::tonic::metrics::v1::{Metric, ResourceMetrics};

/// Entry point for both conversion directions under one schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Converter {
    schema: Schema,
}

impl Converter {
    pub fn new(schema: Schema) -> Self {
        tracing::debug!(schema = %schema, "creating converter");
        Self { schema }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.schema)
    }

    /// Creates a converter from a schema name such as `telegraf-prometheus-v2`.
    pub fn from_schema_name(name: &str) -> Result<Self, Error> {
        Ok(Self::new(name.parse()?))
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Starts a new ingest batch.
    pub fn new_batch(&self) -> MetricsBatch {
        MetricsBatch::new(self.schema)
    }

    /// Writes every representable metric of the tree to `writer`.
    ///
    /// Metrics the schema cannot represent are skipped and counted in the returned
    /// stats. Only writer errors are returned.
    pub fn write_metrics<W: PointWriter + ?Sized>(
        &self,
        resource_metrics: &[ResourceMetrics],
        writer: &mut W,
    ) -> Result<ExportStats, Error> {
        export::write_metrics(self.schema, resource_metrics, writer)
    }

    /// Writes a single metric, returning the number of points written.
    pub fn write_metric<W: PointWriter + ?Sized>(
        &self,
        ctx: MetricContext<'_>,
        metric: &Metric,
        writer: &mut W,
    ) -> Result<usize, Error> {
        export::write_metric(self.schema, ctx, metric, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_schema_name() -> Result<(), Error> {
        assert_eq!(
            Converter::from_schema_name("telegraf-prometheus-v2")?.schema(),
            Schema::TelegrafPrometheusV2
        );
        let err = Converter::from_schema_name("influx-v3").unwrap_err();
        assert!(matches!(
            err,
            Error::ValueError(lp_otlp_core::Error::UnknownSchema(name)) if name == "influx-v3"
        ));
        Ok(())
    }

    #[test]
    fn test_from_config() -> Result<(), serde_json::Error> {
        let config: ConverterConfig =
            serde_json::from_str(r#"{"schema": "telegraf-prometheus-v2"}"#)?;
        assert_eq!(
            Converter::from_config(&config).schema(),
            Schema::TelegrafPrometheusV2
        );
        assert_eq!(
            Converter::from_config(&ConverterConfig::default()).schema(),
            Schema::TelegrafPrometheusV1
        );
        Ok(())
    }

    #[test]
    fn test_batch_uses_converter_schema() -> Result<(), Error> {
        let converter = Converter::new(Schema::TelegrafPrometheusV2);
        let mut batch = converter.new_batch();
        assert_eq!(batch.schema(), Schema::TelegrafPrometheusV2);
        batch.add_point(Point::new("prometheus").field("up", 1.0).timestamp(1))?;
        assert_eq!(batch.into_request().resource_metrics.len(), 1);
        Ok(())
    }
}
