//! Configuration for a line-protocol ↔ OTLP metrics converter.

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::Error;

/// The encoding used to represent OTLP metrics as line-protocol points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Schema {
    /// One point per metric observation; histograms carry every bucket as a field.
    #[default]
    TelegrafPrometheusV1,
    /// Measurement `prometheus`; histograms and summaries span several points.
    TelegrafPrometheusV2,
}

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Schema::TelegrafPrometheusV1 => "telegraf-prometheus-v1",
            Schema::TelegrafPrometheusV2 => "telegraf-prometheus-v2",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "telegraf-prometheus-v1" => Ok(Schema::TelegrafPrometheusV1),
            "telegraf-prometheus-v2" => Ok(Schema::TelegrafPrometheusV2),
            other => Err(Error::UnknownSchema(other.to_owned())),
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Converter configuration, embeddable in a host service's config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConverterConfig {
    #[serde(default)]
    pub schema: Schema,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names() {
        for schema in [Schema::TelegrafPrometheusV1, Schema::TelegrafPrometheusV2] {
            assert_eq!(schema.name().parse::<Schema>(), Ok(schema));
        }
        assert_eq!(
            "prometheus-v3".parse::<Schema>(),
            Err(Error::UnknownSchema("prometheus-v3".to_owned()))
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: ConverterConfig =
            serde_json::from_str(r#"{"schema":"telegraf-prometheus-v2"}"#).unwrap();
        assert_eq!(config.schema, Schema::TelegrafPrometheusV2);

        let config: ConverterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.schema, Schema::TelegrafPrometheusV1);

        let err = serde_json::from_str::<ConverterConfig>(r#"{"schema":"v9"}"#).unwrap_err();
        assert!(err.to_string().contains("unrecognized metrics schema 'v9'"));
    }
}
