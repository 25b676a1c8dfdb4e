//! Dynamically typed task payloads.

use crate::errors::PayloadError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A string-keyed map of dynamically typed values carried by a task.
///
/// No schema is enforced between stages. A transform that needs a particular
/// key uses the `require_*` accessors and propagates the resulting
/// [`PayloadError`] as its own failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(HashMap<String, Value>);

impl Payload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a key, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the payload has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value for `key`, or [`PayloadError::MissingKey`].
    pub fn require(&self, key: &str) -> Result<&Value, PayloadError> {
        self.0.get(key).ok_or_else(|| PayloadError::MissingKey {
            key: key.to_string(),
        })
    }

    /// Returns an integer value.
    pub fn require_i64(&self, key: &str) -> Result<i64, PayloadError> {
        let value = self.require(key)?;
        value.as_i64().ok_or_else(|| PayloadError::WrongKind {
            key: key.to_string(),
            expected: "integer",
            found: kind_of(value),
        })
    }

    /// Returns a string value.
    pub fn require_str(&self, key: &str) -> Result<&str, PayloadError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| PayloadError::WrongKind {
            key: key.to_string(),
            expected: "string",
            found: kind_of(value),
        })
    }

    /// Iterates over the entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Consumes the payload, returning the underlying map.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Value> {
        self.0
    }
}

impl From<HashMap<String, Value>> for Payload {
    fn from(map: HashMap<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = PayloadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(PayloadError::NotAnObject {
                found: kind_of(&other),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_accessors() {
        let payload = Payload::new().with("a", 1).with("name", "x");

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.require_i64("a"), Ok(1));
        assert_eq!(payload.require_str("name"), Ok("x"));
        assert!(payload.contains_key("a"));
    }

    #[test]
    fn test_missing_key() {
        let payload = Payload::new();
        assert_eq!(
            payload.require_i64("a"),
            Err(PayloadError::MissingKey { key: "a".to_string() })
        );
    }

    #[test]
    fn test_wrong_kind() {
        let payload = Payload::new().with("a", "one");
        assert_eq!(
            payload.require_i64("a"),
            Err(PayloadError::WrongKind {
                key: "a".to_string(),
                expected: "integer",
                found: "string",
            })
        );
    }

    #[test]
    fn test_try_from_json() {
        let payload = Payload::try_from(json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(payload, Payload::new().with("a", 1).with("b", 2));

        let err = Payload::try_from(json!([1, 2])).unwrap_err();
        assert_eq!(err, PayloadError::NotAnObject { found: "array" });
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let payload = Payload::new().with("result", "3");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, json!({"result": "3"}));
    }

    #[test]
    fn test_from_iter() {
        let payload: Payload = vec![("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(payload.require_i64("y"), Ok(2));
    }
}
