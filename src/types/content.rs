//! Tree-shaped content values fed to the canonical hasher.

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::Result;

/// A JSON-like value: mapping, ordered sequence or scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentValue {
    Mapping(BTreeMap<String, ContentValue>),
    Sequence(Vec<ContentValue>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Canonical textual representation. Distinct scalars may share one
    /// (`Integer(1)` and `Text("1")`).
    pub fn text(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => n.to_string(),
                None => f.to_string(),
            },
            Scalar::Text(s) => s.clone(),
        }
    }

    /// JSON form used inside canonical serializations. Numbers JSON cannot
    /// carry (non-finite floats, out of range integers) fall back to text.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(i) => {
                if let Ok(v) = i64::try_from(*i) {
                    Value::from(v)
                } else if let Ok(v) = u64::try_from(*i) {
                    Value::from(v)
                } else {
                    Value::String(i.to_string())
                }
            }
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }
}

impl ContentValue {
    /// Converts any serializable value into a content tree.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        ContentValue::Scalar(Scalar::Text(s.into()))
    }
}

impl From<serde_json::Value> for ContentValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ContentValue::Scalar(Scalar::Null),
            Value::Bool(b) => ContentValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                let scalar = if let Some(i) = n.as_i64() {
                    Scalar::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    Scalar::Integer(i128::from(u))
                } else {
                    Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
                };
                ContentValue::Scalar(scalar)
            }
            Value::String(s) => ContentValue::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                ContentValue::Sequence(items.into_iter().map(ContentValue::from).collect())
            }
            Value::Object(map) => ContentValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, ContentValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Scalar> for ContentValue {
    fn from(scalar: Scalar) -> Self {
        ContentValue::Scalar(scalar)
    }
}
