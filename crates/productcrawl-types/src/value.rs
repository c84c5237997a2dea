//! Dynamic attribute value used for products, extraction responses, and
//! anything else that started life as a schema-less wrapper payload.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// A schema-less attribute value. Wrappers emit fields that vary by site, so
/// product rows and extraction metadata are modeled as maps of this type
/// rather than fixed structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// A product/extraction attribute map: `_id`, `sku`, `url`, `time`, …
pub type AttrMap = BTreeMap<String, Value>;

impl Value {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.as_map()?.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.as_map()?.get(key).and_then(Value::as_int)
    }

    pub fn get_int64(&self, key: &str) -> Option<i64> {
        self.as_map()?.get(key).and_then(Value::as_int64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.as_map()?.get(key).and_then(Value::as_bool)
    }

    pub fn get_map(&self, key: &str) -> Option<&AttrMap> {
        self.as_map()?.get(key).and_then(Value::as_map)
    }

    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.as_map()?.get(key).and_then(Value::as_list)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        self.as_int64().map(|n| n as i32)
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n as i64),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "1" | "true" | "TRUE" => Some(true),
                "0" | "false" | "FALSE" => Some(false),
                _ => None,
            },
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut AttrMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Returns only the string-typed entries of a list field, dropping
    /// anything else silently.
    pub fn filter_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A value is empty when absent, a zero-length array, a zero-length map,
    /// or the empty string. Numbers and booleans are never empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for JsonValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s),
            Value::List(items) => JsonValue::Array(items.into_iter().map(JsonValue::from).collect()),
            Value::Map(map) => {
                JsonValue::Object(map.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        let mut m = AttrMap::new();
        m.insert("name".into(), Value::String("Widget".into()));
        m.insert("qty".into(), Value::Number(3.0));
        m.insert("active".into(), Value::Bool(true));
        m.insert("tags".into(), Value::List(vec![Value::String("a".into()), Value::Number(1.0)]));
        Value::Map(m)
    }

    #[test]
    fn accessors_read_typed_fields() {
        let v = sample();
        assert_eq!(v.get_string("name"), Some("Widget"));
        assert_eq!(v.get_int("qty"), Some(3));
        assert_eq!(v.get_bool("active"), Some(true));
        assert_eq!(v.get_string("missing"), None);
    }

    #[test]
    fn filter_string_list_drops_non_strings() {
        let v = sample();
        assert_eq!(v.filter_string_list("tags"), vec!["a".to_string()]);
    }

    #[test]
    fn empty_detection_matches_spec() {
        assert!(Value::Null.is_empty_value());
        assert!(Value::String(String::new()).is_empty_value());
        assert!(Value::List(vec![]).is_empty_value());
        assert!(!Value::Bool(false).is_empty_value());
        assert!(!Value::Number(0.0).is_empty_value());
    }

    #[test]
    fn json_roundtrip_preserves_shape() {
        let j: JsonValue = serde_json::json!({"a": 1, "b": [true, "x"]});
        let v: Value = j.clone().into();
        let back: JsonValue = v.into();
        assert_eq!(j, back);
    }
}
