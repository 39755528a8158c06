//! Deterministic SHA-256 digests of content trees.
//!
//! Nested mappings are replaced by a `dict-<digest>` placeholder before
//! their parent is serialized, so every digest only ever serializes one
//! level of mapping with sorted keys.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::ContentValue;

pub struct ContentHasher;

impl ContentHasher {
    /// Hex digest of `value`. With `order_insensitive`, permuting any
    /// sequence leaves the digest unchanged.
    pub fn hash(value: &ContentValue, order_insensitive: bool) -> String {
        match value {
            ContentValue::Mapping(map) => Self::hash_mapping(map, order_insensitive),
            ContentValue::Sequence(items) => {
                let canonical = Value::Array(Self::resolve_sequence(items, order_insensitive));
                sha256_hex(canonical.to_string().as_bytes())
            }
            ContentValue::Scalar(scalar) => sha256_hex(scalar.text().as_bytes()),
        }
    }

    /// Digest of any serializable value, e.g. a whole post record.
    pub fn hash_serialize<T: serde::Serialize + ?Sized>(
        value: &T,
        order_insensitive: bool,
    ) -> crate::Result<String> {
        Ok(Self::hash(
            &ContentValue::from_serialize(value)?,
            order_insensitive,
        ))
    }

    pub fn is_same_content(a: &ContentValue, b: &ContentValue, order_insensitive: bool) -> bool {
        Self::hash(a, order_insensitive) == Self::hash(b, order_insensitive)
    }

    fn hash_mapping(map: &BTreeMap<String, ContentValue>, order_insensitive: bool) -> String {
        // Inserted in key order, so the object serializes sorted whether or
        // not serde_json preserves insertion order.
        let mut resolved = serde_json::Map::new();
        for (key, value) in map {
            resolved.insert(key.clone(), Self::resolve(value, order_insensitive));
        }
        sha256_hex(Value::Object(resolved).to_string().as_bytes())
    }

    fn resolve(value: &ContentValue, order_insensitive: bool) -> Value {
        match value {
            ContentValue::Mapping(map) => {
                Value::String(format!("dict-{}", Self::hash_mapping(map, order_insensitive)))
            }
            ContentValue::Sequence(items) => {
                Value::Array(Self::resolve_sequence(items, order_insensitive))
            }
            ContentValue::Scalar(scalar) => scalar.to_json(),
        }
    }

    fn resolve_sequence(items: &[ContentValue], order_insensitive: bool) -> Vec<Value> {
        let mut resolved: Vec<Value> = items
            .iter()
            .map(|item| Self::resolve(item, order_insensitive))
            .collect();
        if order_insensitive {
            resolved.sort_by_cached_key(sort_key);
        }
        resolved
    }
}

fn sort_key(value: &Value) -> (&'static str, String) {
    match value {
        Value::Array(_) => ("sequence", value.to_string()),
        Value::Object(_) => ("mapping", value.to_string()),
        Value::String(s) => ("text", s.clone()),
        Value::Null => ("null", "null".to_string()),
        Value::Bool(b) => ("bool", b.to_string()),
        Value::Number(n) if n.is_f64() => ("float", n.to_string()),
        Value::Number(n) => ("integer", n.to_string()),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
