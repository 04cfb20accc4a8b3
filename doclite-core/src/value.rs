// src/value.rs
// Dynamically typed field values and their JSON mapping

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value as Json;

use crate::document::Document;

/// A single field value stored in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    ObjectId(String),
    Document(Document),
    Array(Vec<Value>),
}

impl Value {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::ObjectId(_) => "objectId",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Comparison used by filter operators.
    ///
    /// Only values of comparable kinds are ordered: numbers (int and float mix
    /// freely), strings, bools, timestamps and object ids. Anything else
    /// yields `None` so range operators fail closed.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::ObjectId(a), Value::ObjectId(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Equality with numeric widening (`20 == 20.0`)
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            // field order is significant
            (Value::Document(a), Value::Document(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va.loosely_equals(vb))
            }
            _ => self == other,
        }
    }

    /// Rank of the value's type when sorting heterogeneous values
    pub(crate) fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Document(_) => 3,
            Value::Array(_) => 4,
            Value::ObjectId(_) => 5,
            Value::Bool(_) => 6,
            Value::Timestamp(_) => 7,
        }
    }

    /// Total order used by cursor sorting
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match self.compare(other) {
            Some(ord) => ord,
            None => match self.sort_rank().cmp(&other.sort_rank()) {
                // same rank but incomparable: documents, arrays, NaN
                Ordering::Equal => self.to_json().to_string().cmp(&other.to_json().to_string()),
                ord => ord,
            },
        }
    }

    /// Extended JSON rendering (`$date`, `$oid`)
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Timestamp(t) => {
                let mut map = serde_json::Map::new();
                map.insert(
                    "$date".to_string(),
                    Json::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                );
                Json::Object(map)
            }
            Value::ObjectId(oid) => {
                let mut map = serde_json::Map::new();
                map.insert("$oid".to_string(), Json::String(oid.clone()));
                Json::Object(map)
            }
            Value::Document(doc) => doc.to_json(),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }

    /// Recognise `{"$date": ...}` and `{"$oid": ...}` wrappers
    pub(crate) fn from_extended_json(map: &serde_json::Map<String, Json>) -> Option<Value> {
        if map.len() != 1 {
            return None;
        }
        let (key, inner) = map.iter().next()?;
        match (key.as_str(), inner) {
            ("$date", Json::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| Value::Timestamp(t.with_timezone(&Utc))),
            ("$date", Json::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(Value::Timestamp),
            ("$oid", Json::String(s)) => Some(Value::ObjectId(s.clone())),
            _ => None,
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from(&json)
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            Json::Object(map) => Value::from_extended_json(map)
                .unwrap_or_else(|| Value::Document(Document::from_json_map(map))),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_numbers_map_to_int_and_float() {
        assert_eq!(Value::from(json!(20)), Value::Int(20));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from(json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn test_extended_json_date() {
        let value = Value::from(json!({"$date": "2014-08-04T21:01:00.000Z"}));
        let ts = value.as_timestamp().unwrap();
        assert_eq!(ts.to_rfc3339_opts(SecondsFormat::Secs, true), "2014-08-04T21:01:00Z");

        assert_eq!(value.to_json(), json!({"$date": "2014-08-04T21:01:00Z"}));
    }

    #[test]
    fn test_extended_json_date_keeps_sub_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2014, 8, 4, 21, 1, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let value = Value::from(ts);

        let rendered = value.to_json();
        assert_eq!(rendered, json!({"$date": "2014-08-04T21:01:00.123456789Z"}));
        assert_eq!(Value::from(&rendered), value);
    }

    #[test]
    fn test_null() {
        assert!(Value::from(json!(null)).is_null());
        assert!(!Value::Int(0).is_null());
    }

    #[test]
    fn test_extended_json_date_millis() {
        let value = Value::from(json!({"$date": 0}));
        assert_eq!(value.as_timestamp().unwrap().timestamp(), 0);
    }

    #[test]
    fn test_extended_json_oid() {
        let value = Value::from(json!({"$oid": "53e613283dc8648ef92df4cf"}));
        assert_eq!(value, Value::ObjectId("53e613283dc8648ef92df4cf".into()));
    }

    #[test]
    fn test_invalid_date_stays_a_document() {
        let value = Value::from(json!({"$date": "not a date"}));
        assert!(value.as_document().is_some());
    }

    #[test]
    fn test_embedded_documents_compare_in_order_with_widening() {
        let stored = Value::from(json!({"x": 10, "y": 5}));
        assert!(stored.loosely_equals(&Value::from(json!({"x": 10.0, "y": 5}))));
        assert!(!stored.loosely_equals(&Value::from(json!({"y": 5, "x": 10}))));
        assert!(!stored.loosely_equals(&Value::from(json!({"x": 10}))));
        assert_ne!(stored, Value::from(json!({"y": 5, "x": 10})));
    }

    #[test]
    fn test_compare_mixed_numbers() {
        assert_eq!(Value::Int(20).compare(&Value::Float(20.0)), Some(Ordering::Equal));
        assert_eq!(Value::Int(10).compare(&Value::Float(10.5)), Some(Ordering::Less));
        assert!(Value::Int(20).loosely_equals(&Value::Float(20.0)));
        assert_ne!(Value::Int(20), Value::Float(20.0));
    }

    #[test]
    fn test_compare_incomparable_kinds() {
        assert_eq!(Value::Int(1).compare(&Value::from("1")), None);
        assert_eq!(Value::Bool(true).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_sort_cmp_orders_types() {
        let mut values = vec![
            Value::Bool(false),
            Value::from("b"),
            Value::Int(3),
            Value::Null,
            Value::from("a"),
            Value::Float(1.5),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));

        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(1.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
                Value::Bool(false),
            ]
        );
    }

    #[test]
    fn test_nan_renders_as_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), Json::Null);
    }
}
