// Generic record trait and field values for any viewable type

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Core trait that any record shown in a collection view must implement
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Collection name for this record type (e.g., "members", "payments")
    /// Determines the JSONL filename and the REST path segment
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Fields usable as filter and sort keys
    /// Return empty HashMap if the record exposes none
    fn fields(&self) -> HashMap<String, FieldValue> {
        HashMap::new()
    }

    /// Look up a single field. Missing fields are undefined (`None`).
    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields().remove(name)
    }
}

/// Value types a record field can hold for filtering and sorting
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Numeric view of the value, parsing numeric strings
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Bool(_) | FieldValue::Date(_) => None,
        }
    }

    /// Date view of the value. Strings in `YYYY-MM-DD` or RFC 3339 form qualify.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::String(s) => parse_date(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        FieldValue::Date(d)
    }
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Schemaless record backed by a JSON object
///
/// Field names may be dotted paths (`address.city`) into nested objects.
/// Arrays, objects and nulls resolve to undefined.
/// The id is read from `id`, falling back to `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    data: Map<String, Value>,
    id: String,
}

/// Id keys recognised on schemaless records, in lookup order
pub const ID_FIELDS: [&str; 2] = ["id", "_id"];

impl JsonRecord {
    /// Wrap a JSON object, reading the identifier from `id` or `_id`.
    ///
    /// Returns `None` when the value is not an object or has no usable id.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(data) = value else {
            return None;
        };
        let id = id_of(&data)?;
        Some(Self { data, id })
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

impl Serialize for JsonRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonRecord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        JsonRecord::from_value(value).ok_or_else(|| serde::de::Error::custom("record must be an object with an `id` or `_id` field"))
    }
}

impl Record for JsonRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "records"
    }

    fn fields(&self) -> HashMap<String, FieldValue> {
        self.data
            .iter()
            .filter_map(|(k, v)| json_to_field(v).map(|fv| (k.clone(), fv)))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.lookup(name).and_then(json_to_field)
    }
}

/// First usable id under [`ID_FIELDS`]; numbers are rendered as strings
pub fn id_of(data: &Map<String, Value>) -> Option<String> {
    ID_FIELDS.iter().find_map(|key| match data.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn json_to_field(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::String(s.clone())),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(FieldValue::Int)
            .or_else(|| n.as_f64().map(FieldValue::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestRecord {
        id: String,
        name: String,
    }

    impl Record for TestRecord {
        fn id(&self) -> &str {
            &self.id
        }

        fn collection_name() -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_record_trait_implementation() {
        let record = TestRecord {
            id: "test-1".to_string(),
            name: "Test".to_string(),
        };

        assert_eq!(record.id(), "test-1");
        assert_eq!(record.name, "Test");
        assert_eq!(TestRecord::collection_name(), "test");
        assert!(record.fields().is_empty());
        assert!(record.field("name").is_none());
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::String("test".to_string()).to_string(), "test");
        assert_eq!(FieldValue::Int(42).to_string(), "42");
        assert_eq!(FieldValue::Float(999.99).to_string(), "999.99");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(FieldValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(FieldValue::from("12.5").as_f64(), Some(12.5));
        assert_eq!(FieldValue::from("abc").as_f64(), None);
        assert_eq!(FieldValue::Bool(true).as_f64(), None);

        let date = FieldValue::from("2024-01-10").as_date().unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-10T00:00:00+00:00");
        assert!(FieldValue::from("2024-01-10T12:00:00Z").as_date().is_some());
        assert!(FieldValue::from("next tuesday").as_date().is_none());
    }

    #[test]
    fn test_json_record_ids() {
        let r = JsonRecord::from_value(json!({"id": 7, "name": "x"})).unwrap();
        assert_eq!(r.id(), "7");

        let r = JsonRecord::from_value(json!({"_id": "abc"})).unwrap();
        assert_eq!(r.id(), "abc");

        // Blank `id` falls through to `_id`
        let r = JsonRecord::from_value(json!({"id": " ", "_id": 3})).unwrap();
        assert_eq!(r.id(), "3");

        assert!(JsonRecord::from_value(json!({"uuid": "abc"})).is_none());
        assert!(JsonRecord::from_value(json!({"name": "no id"})).is_none());
        assert!(JsonRecord::from_value(json!({"id": ""})).is_none());
        assert!(JsonRecord::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_json_record_serde() {
        let r: JsonRecord = serde_json::from_str(r#"{"_id":"u1","name":"Sam"}"#).unwrap();
        assert_eq!(r.id(), "u1");
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({"_id": "u1", "name": "Sam"}));

        assert!(serde_json::from_str::<JsonRecord>(r#"{"name":"Sam"}"#).is_err());
    }

    #[test]
    fn test_json_record_nested_fields() {
        let r = JsonRecord::from_value(json!({
            "id": "m1",
            "amount": 1000.5,
            "active": true,
            "address": {"city": "Leeds"},
            "tags": ["a"],
            "note": null
        }))
        .unwrap();

        assert_eq!(r.field("address.city"), Some(FieldValue::from("Leeds")));
        assert_eq!(r.field("amount"), Some(FieldValue::Float(1000.5)));
        assert_eq!(r.field("active"), Some(FieldValue::Bool(true)));
        assert_eq!(r.field("tags"), None);
        assert_eq!(r.field("note"), None);
        assert_eq!(r.field("address.zip"), None);
        assert_eq!(r.field("missing"), None);
    }
}
