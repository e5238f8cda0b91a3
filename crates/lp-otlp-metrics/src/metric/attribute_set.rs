//! Hashable attribute identities used to key resources and data point series.

use std::collections::BTreeMap;

use lp_otlp_core::convert::string_attribute;
use opentelemetry_proto::tonic::common::v1::KeyValue;

/// An order-independent set of string attributes.
///
/// Pairs are kept sorted by key so equal sets compare and hash equal regardless of
/// the order tags arrived in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeSet {
    attributes: Vec<(String, String)>,
}

impl AttributeSet {
    pub fn to_otlp_attributes(&self) -> Vec<KeyValue> {
        self.attributes
            .iter()
            .map(|(k, v)| string_attribute(k, v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<&BTreeMap<String, String>> for AttributeSet {
    fn from(tags: &BTreeMap<String, String>) -> Self {
        // BTreeMap iteration is already sorted by key with no duplicates.
        AttributeSet {
            attributes: tags.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

/// Identity of one data point within a metric: its timestamp and attribute set.
///
/// V2 histogram and summary lines sharing a series key are merged into one data point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub time_unix_nano: u64,
    pub attributes: AttributeSet,
}
