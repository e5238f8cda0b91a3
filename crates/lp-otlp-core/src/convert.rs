//! Helpers converting OTLP attribute values to and from line-protocol tag strings.

use base64::Engine;
use opentelemetry_proto::tonic::common::v1::{any_value::Value, AnyValue, KeyValue};

/// Builds an OTLP string attribute.
pub fn string_attribute(key: impl Into<String>, value: impl Into<String>) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: Some(AnyValue {
            value: Some(Value::StringValue(value.into())),
        }),
    }
}

/// Renders an OTLP attribute value as a tag value.
///
/// Returns `None` for an empty value.
pub fn any_value_to_tag(value: &AnyValue) -> Option<String> {
    let result = match value.value.as_ref()? {
        Value::StringValue(s) => s.clone(),
        Value::BoolValue(b) => b.to_string(),
        Value::IntValue(i) => i.to_string(),
        Value::DoubleValue(d) => d.to_string(),
        Value::BytesValue(b) => base64::engine::general_purpose::STANDARD.encode(b),
        Value::ArrayValue(_) | Value::KvlistValue(_) => any_value_to_json(value).to_string(),
    };
    Some(result)
}

// converts an OTLP AnyValue into its JSON form, used for nested values.
fn any_value_to_json(value: &AnyValue) -> serde_json::Value {
    match value.value.as_ref() {
        None => serde_json::Value::Null,
        Some(Value::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Value::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Value::IntValue(i)) => serde_json::Value::from(*i),
        Some(Value::DoubleValue(d)) => serde_json::Value::from(*d),
        Some(Value::BytesValue(b)) => serde_json::Value::String(
            base64::engine::general_purpose::STANDARD.encode(b),
        ),
        Some(Value::ArrayValue(av)) => {
            serde_json::Value::Array(av.values.iter().map(any_value_to_json).collect())
        }
        Some(Value::KvlistValue(kvs)) => serde_json::Value::Object(
            kvs.values
                .iter()
                .map(|kv| {
                    let v = kv
                        .value
                        .as_ref()
                        .map(any_value_to_json)
                        .unwrap_or(serde_json::Value::Null);
                    (kv.key.clone(), v)
                })
                .collect(),
        ),
    }
}
