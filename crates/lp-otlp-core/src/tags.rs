//! Partitioning of flat tags into resource, instrumentation scope and point attributes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use opentelemetry_proto::tonic::common::v1::{InstrumentationScope, KeyValue};
use regex::Regex;

use crate::convert::any_value_to_tag;
use crate::keys::{SCOPE_NAME, SCOPE_VERSION};

/// Semantic-convention namespaces whose attributes describe the resource.
const RESOURCE_NAMESPACES: &[&str] = &[
    "service.",
    "telemetry.",
    "container.",
    "process.",
    "host.",
    "os.",
    "device.",
    "cloud.",
    "deployment.",
    "k8s.",
    "aws.",
    "gcp.",
    "azure.",
    "heroku.",
    "browser.",
    "webengine.",
];

/// `faas.*` is shared with span attributes; only these keys are resource attributes.
const RESOURCE_FAAS_KEYS: &[&str] = &[
    "faas.name",
    "faas.id",
    "faas.version",
    "faas.instance",
    "faas.max_memory",
];

static RESOURCE_NAMESPACE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&resource_namespace_pattern()).ok());

fn resource_namespace_pattern() -> String {
    let prefixes = RESOURCE_NAMESPACES.iter().map(|p| regex::escape(p));
    let exact = RESOURCE_FAAS_KEYS
        .iter()
        .map(|k| format!("{}$", regex::escape(k)));
    let alternatives: Vec<String> = prefixes.chain(exact).collect();
    format!("^(?:{})", alternatives.join("|"))
}

/// True if the tag key names a resource attribute.
pub fn is_resource_key(key: &str) -> bool {
    RESOURCE_NAMESPACE
        .as_ref()
        .is_some_and(|re| re.is_match(key))
}

/// A flat tag set split into the three levels of the OTLP hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitTags {
    pub resource: BTreeMap<String, String>,
    pub scope_name: String,
    pub scope_version: String,
    pub attributes: BTreeMap<String, String>,
}

/// Splits tags into resource attributes, scope name/version and point attributes.
///
/// Tags with an empty key are dropped.
pub fn split_tags<'a>(tags: impl IntoIterator<Item = (&'a String, &'a String)>) -> SplitTags {
    let mut split = SplitTags::default();
    for (key, value) in tags {
        if key.is_empty() {
            tracing::debug!(value = %value, "dropping tag with empty key");
            continue;
        }
        match key.as_str() {
            SCOPE_NAME => split.scope_name = value.clone(),
            SCOPE_VERSION => split.scope_version = value.clone(),
            k if is_resource_key(k) => {
                split.resource.insert(key.clone(), value.clone());
            }
            _ => {
                split.attributes.insert(key.clone(), value.clone());
            }
        }
    }
    split
}

/// Flattens resource attributes, scope and point attributes into one tag set.
///
/// Later levels overwrite earlier ones on key conflicts, so point attributes win.
pub fn merge_tags(
    resource: &[KeyValue],
    scope: Option<&InstrumentationScope>,
    attributes: &[KeyValue],
) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    insert_attributes(&mut tags, resource);
    if let Some(scope) = scope {
        if !scope.name.is_empty() {
            tags.insert(SCOPE_NAME.to_owned(), scope.name.clone());
        }
        if !scope.version.is_empty() {
            tags.insert(SCOPE_VERSION.to_owned(), scope.version.clone());
        }
    }
    insert_attributes(&mut tags, attributes);
    tags
}

fn insert_attributes(tags: &mut BTreeMap<String, String>, attributes: &[KeyValue]) {
    for kv in attributes {
        if kv.key.is_empty() {
            tracing::debug!("dropping attribute with empty key");
            continue;
        }
        match kv.value.as_ref().and_then(any_value_to_tag) {
            Some(value) => {
                tags.insert(kv.key.clone(), value);
            }
            None => tracing::debug!(key = %kv.key, "dropping attribute without value"),
        }
    }
}
