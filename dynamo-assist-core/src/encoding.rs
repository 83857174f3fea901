/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Native and wire encodings of flat items.
//!
//! Both encodings are produced by the same walk over a [`serde_json::Value`] tree; they
//! differ only in the [`Encoding`] that builds each node. The native encoding keeps
//! idiomatic JSON values, the wire encoding produces the store's typed
//! [`AttributeValue`]s (`{"S": ..}`, `{"N": ..}`, ...).

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::error::MappingError;

/// A flat item in the native encoding.
pub type Item = Map<String, Value>;

/// A flat item in the store's low-level attribute-value encoding.
pub type WireItem = HashMap<String, AttributeValue>;

/// Builds encoded nodes during a value walk.
pub trait Encoding {
    /// The encoded node type.
    type Value;

    /// Encodes a null.
    fn null(&self) -> Self::Value;
    /// Encodes a boolean.
    fn bool(&self, value: bool) -> Self::Value;
    /// Encodes a number.
    fn number(&self, value: &Number) -> Self::Value;
    /// Encodes a string.
    fn string(&self, value: String) -> Self::Value;
    /// Encodes a list of already-encoded elements.
    fn list(&self, values: Vec<Self::Value>) -> Self::Value;
    /// Encodes a map of already-encoded entries.
    fn map(&self, entries: Vec<(String, Self::Value)>) -> Self::Value;
}

/// Keeps values as [`serde_json::Value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

/// Produces [`AttributeValue`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wire;

impl Encoding for Native {
    type Value = Value;

    fn null(&self) -> Value {
        Value::Null
    }

    fn bool(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn number(&self, value: &Number) -> Value {
        Value::Number(value.clone())
    }

    fn string(&self, value: String) -> Value {
        Value::String(value)
    }

    fn list(&self, values: Vec<Value>) -> Value {
        Value::Array(values)
    }

    fn map(&self, entries: Vec<(String, Value)>) -> Value {
        Value::Object(entries.into_iter().collect())
    }
}

impl Encoding for Wire {
    type Value = AttributeValue;

    fn null(&self) -> AttributeValue {
        AttributeValue::Null(true)
    }

    fn bool(&self, value: bool) -> AttributeValue {
        AttributeValue::Bool(value)
    }

    // `Number`'s display is the shortest text that round-trips, so floats stay decimal-safe.
    fn number(&self, value: &Number) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    fn string(&self, value: String) -> AttributeValue {
        AttributeValue::S(value)
    }

    fn list(&self, values: Vec<AttributeValue>) -> AttributeValue {
        AttributeValue::L(values)
    }

    fn map(&self, entries: Vec<(String, AttributeValue)>) -> AttributeValue {
        AttributeValue::M(entries.into_iter().collect())
    }
}

/// Walks `value`, building each node with `encoding`.
pub fn encode<En: Encoding>(value: Value, encoding: &En) -> En::Value {
    match value {
        Value::Null => encoding.null(),
        Value::Bool(b) => encoding.bool(b),
        Value::Number(n) => encoding.number(&n),
        Value::String(s) => encoding.string(s),
        Value::Array(values) => {
            encoding.list(values.into_iter().map(|v| encode(v, encoding)).collect())
        }
        Value::Object(entries) => encoding.map(
            entries
                .into_iter()
                .map(|(k, v)| (k, encode(v, encoding)))
                .collect(),
        ),
    }
}

/// Encodes every attribute of a native item.
pub fn encode_item<En: Encoding>(item: Item, encoding: &En) -> Vec<(String, En::Value)> {
    item.into_iter()
        .map(|(k, v)| (k, encode(v, encoding)))
        .collect()
}

/// Converts a native item into the wire encoding.
pub fn to_wire_item(item: Item) -> WireItem {
    encode_item(item, &Wire).into_iter().collect()
}

/// Converts a single native value into the wire encoding.
pub fn to_wire_value(value: &Value) -> AttributeValue {
    encode(value.clone(), &Wire)
}

/// Converts a wire item back into the native encoding.
pub fn decode_wire_item(item: WireItem) -> Result<Item, MappingError> {
    item.into_iter()
        .map(|(k, v)| Ok((k, from_wire_value(v)?)))
        .collect()
}

/// Converts a single wire value back into the native encoding.
///
/// Sets become arrays and binary values become lowercase hex strings, mirroring the
/// way bytes are written by [`codec::hex_bytes`](crate::codec::hex_bytes).
pub fn from_wire_value(value: AttributeValue) -> Result<Value, MappingError> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s),
        AttributeValue::N(n) => Value::Number(parse_number(&n)?),
        AttributeValue::Bool(b) => Value::Bool(b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(b) => Value::String(hex::encode(b.as_ref())),
        AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
        AttributeValue::Ns(values) => Value::Array(
            values
                .iter()
                .map(|n| parse_number(n).map(Value::Number))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::Bs(values) => Value::Array(
            values
                .iter()
                .map(|b| Value::String(hex::encode(b.as_ref())))
                .collect(),
        ),
        AttributeValue::L(values) => Value::Array(
            values
                .into_iter()
                .map(from_wire_value)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(entries) => Value::Object(decode_wire_item(entries)?),
        other => {
            return Err(MappingError::unsupported_value(format!(
                "unknown attribute value {:?}",
                other
            )))
        }
    })
}

fn parse_number(text: &str) -> Result<Number, MappingError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Number::from(u));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| {
            MappingError::unsupported_value(format!("cannot parse '{text}' as a number"))
        })
}

/// Wraps raw bytes as a wire binary value.
pub fn binary(bytes: impl Into<Vec<u8>>) -> AttributeValue {
    AttributeValue::B(Blob::new(bytes.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn wire_encoding_tags_every_node() {
        let value = json!({
            "name": "widget",
            "price": 12.5,
            "tags": ["a", "b"],
            "active": true,
            "notes": null,
        });
        let AttributeValue::M(map) = encode(value, &Wire) else {
            panic!("expected a map");
        };
        assert_eq!(map.get("name"), Some(&AttributeValue::S("widget".into())));
        assert_eq!(map.get("price"), Some(&AttributeValue::N("12.5".into())));
        assert_eq!(
            map.get("tags"),
            Some(&AttributeValue::L(vec![
                AttributeValue::S("a".into()),
                AttributeValue::S("b".into())
            ]))
        );
        assert_eq!(map.get("active"), Some(&AttributeValue::Bool(true)));
        assert_eq!(map.get("notes"), Some(&AttributeValue::Null(true)));
    }

    #[test]
    fn native_encoding_is_identity() {
        let value = json!({"a": [1, {"b": "c"}], "d": 0.1});
        assert_eq!(encode(value.clone(), &Native), value);
    }

    #[test]
    fn float_text_is_shortest_roundtrip() {
        let value = json!(0.1 + 0.2);
        assert_eq!(
            to_wire_value(&value),
            AttributeValue::N("0.30000000000000004".into())
        );
    }

    #[test]
    fn decode_handles_sets_and_binary() {
        let mut item = WireItem::new();
        item.insert("ids".into(), AttributeValue::Ns(vec!["1".into(), "2.5".into()]));
        item.insert("labels".into(), AttributeValue::Ss(vec!["x".into()]));
        item.insert("blob".into(), binary(vec![0xde, 0xad]));
        let decoded = decode_wire_item(item).unwrap();
        assert_eq!(decoded.get("ids"), Some(&json!([1, 2.5])));
        assert_eq!(decoded.get("labels"), Some(&json!(["x"])));
        assert_eq!(decoded.get("blob"), Some(&json!("dead")));
    }

    #[test]
    fn decode_rejects_non_numeric_text() {
        let err = from_wire_value(AttributeValue::N("twelve".into())).unwrap_err();
        assert!(err.to_string().contains("cannot parse 'twelve'"));
    }
}
