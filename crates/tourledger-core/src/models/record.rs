use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Open field bag carried by every record, and the shape of create input and
/// update patches.
pub type Fields = Map<String, Value>;

/// Field name of the record id in serialized form.
pub const ID_FIELD: &str = "id";

/// Field name of the creation timestamp in serialized form.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Last id handed out by `RecordId::generate` in this process.
static LAST_GENERATED_ID: AtomicI64 = AtomicI64::new(0);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Record has no id")]
    MissingId,
}

/// Record identifier.
///
/// Locally created records use epoch-millisecond integers; the remote service
/// may hand back string ids. Lookups compare the string form (`key`) so
/// `7` and `"7"` address the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Allocate a fresh id from the current time in milliseconds.
    /// Never returns the same value twice within one process.
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut last = LAST_GENERATED_ID.load(Ordering::Relaxed);
        loop {
            let next = if now > last { now } else { last + 1 };
            match LAST_GENERATED_ID.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return RecordId::Int(next),
                Err(actual) => last = actual,
            }
        }
    }

    /// Interpret a JSON value as an id. Only integers and strings qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }

    /// Parse user input: integers become `Int`, anything else `Text`.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(s.to_string()),
        }
    }

    /// String form used for id comparison and URL path segments.
    pub fn key(&self) -> String {
        match self {
            RecordId::Int(n) => n.to_string(),
            RecordId::Text(s) => s.clone(),
        }
    }

    /// Numeric form, parsing text ids that hold an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RecordId::Int(n) => Some(*n),
            RecordId::Text(s) => s.trim().parse().ok(),
        }
    }

    /// True when both ids have the same string form.
    pub fn matches(&self, other: &RecordId) -> bool {
        self.key() == other.key()
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Text(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// Current time as an ISO-8601 UTC timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single persisted item of a collection.
///
/// Decoding goes through the field map so that a `createdAt` which is not a
/// string (epoch millis, say) stays in `fields` instead of failing the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Fields")]
pub struct Record {
    pub id: RecordId,
    /// String creation timestamp. `None` when the remote service omitted it
    /// or sent a non-string value, which is then kept in `fields`.
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Build a record from caller-supplied fields, assigning `id` and
    /// `createdAt` when they are absent.
    ///
    /// Fails only when an `id` is present but is neither an integer nor a
    /// string.
    pub fn from_fields(mut fields: Fields) -> Result<Self, RecordError> {
        let id = match fields.remove(ID_FIELD) {
            None | Some(Value::Null) => RecordId::generate(),
            Some(value) => Self::parse_id(value)?,
        };
        let created_at = match Self::take_created_at(&mut fields) {
            Some(created_at) => Some(created_at),
            None if fields.contains_key(CREATED_AT_FIELD) => None,
            None => Some(now_timestamp()),
        };
        Ok(Self {
            id,
            created_at,
            fields,
        })
    }

    fn parse_id(value: Value) -> Result<RecordId, RecordError> {
        RecordId::from_value(&value).ok_or_else(|| RecordError::InvalidId(value.to_string()))
    }

    /// Remove a string or null `createdAt` from `fields`; any other value
    /// is left in place.
    fn take_created_at(fields: &mut Fields) -> Option<String> {
        match fields.remove(CREATED_AT_FIELD) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) | None => None,
            Some(other) => {
                fields.insert(CREATED_AT_FIELD.to_string(), other);
                None
            }
        }
    }

    /// Decode a record received from the remote service.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Shallow merge: every patch field overwrites the existing one.
    /// The id is kept; a string `createdAt` in the patch replaces the
    /// current one.
    pub fn merged(&self, patch: &Fields) -> Self {
        let mut merged = self.clone();
        for (key, value) in patch {
            match key.as_str() {
                ID_FIELD => {}
                CREATED_AT_FIELD => match value {
                    Value::String(s) => {
                        merged.fields.remove(CREATED_AT_FIELD);
                        merged.created_at = Some(s.clone());
                    }
                    Value::Null => {}
                    other => {
                        merged.created_at = None;
                        merged.fields.insert(key.clone(), other.clone());
                    }
                },
                _ => {
                    merged.fields.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Flatten back into a single field map including `id` and `createdAt`.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(ID_FIELD.to_string(), self.id.to_value());
        if let Some(ref created_at) = self.created_at {
            fields.insert(CREATED_AT_FIELD.to_string(), Value::from(created_at.clone()));
        }
        for (key, value) in &self.fields {
            fields.insert(key.clone(), value.clone());
        }
        fields
    }
}

impl TryFrom<Fields> for Record {
    type Error = RecordError;

    fn try_from(mut fields: Fields) -> Result<Self, Self::Error> {
        let id = Self::parse_id(fields.remove(ID_FIELD).ok_or(RecordError::MissingId)?)?;
        let created_at = Self::take_created_at(&mut fields);
        Ok(Self {
            id,
            created_at,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_generate_is_strictly_increasing() {
        let a = RecordId::generate().as_i64().unwrap();
        let b = RecordId::generate().as_i64().unwrap();
        let c = RecordId::generate().as_i64().unwrap();
        assert!(a < b && b < c);
        // Close to wall-clock milliseconds
        assert!((a - Utc::now().timestamp_millis()).abs() < 60_000);
    }

    #[test]
    fn test_id_key_matches_across_representations() {
        assert!(RecordId::Int(7).matches(&RecordId::Text("7".to_string())));
        assert!(!RecordId::Int(7).matches(&RecordId::Int(8)));
        assert_eq!(RecordId::Text(" 42".to_string()).as_i64(), Some(42));
        assert_eq!(RecordId::Text("abc".to_string()).as_i64(), None);
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(RecordId::parse("42"), RecordId::Int(42));
        assert_eq!(RecordId::parse("q-42"), RecordId::Text("q-42".to_string()));
    }

    #[test]
    fn test_from_fields_assigns_missing_core_fields() {
        let record = Record::from_fields(fields(json!({"group": "Nile Trip"}))).unwrap();
        assert!(matches!(record.id, RecordId::Int(_)));
        let created_at = record.created_at.clone().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&created_at).is_ok());
        assert_eq!(record.get("group"), Some(&json!("Nile Trip")));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn test_from_fields_keeps_supplied_core_fields() {
        let record = Record::from_fields(fields(json!({
            "id": 99,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "group": "Luxor"
        })))
        .unwrap();
        assert_eq!(record.id, RecordId::Int(99));
        assert_eq!(record.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_from_fields_rejects_malformed_id() {
        let result = Record::from_fields(fields(json!({"id": {"nested": true}})));
        assert!(matches!(result, Err(RecordError::InvalidId(_))));
        let result = Record::from_fields(fields(json!({"id": 1.5})));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let record = Record::from_fields(fields(json!({"id": 1, "createdAt": "t", "pax": 4}))).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": 1, "createdAt": "t", "pax": 4}));

        let back = Record::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_server_record_without_created_at() {
        let record = Record::from_value(json!({"id": "abc", "total": "10.00"})).unwrap();
        assert_eq!(record.id, RecordId::Text("abc".to_string()));
        assert!(record.created_at.is_none());
        assert!(Record::from_value(json!({"total": "10.00"})).is_err());
    }

    #[test]
    fn test_non_string_created_at_is_kept_as_a_field() {
        let record = Record::from_fields(fields(json!({"createdAt": 1714550400000_i64, "pax": 2}))).unwrap();
        assert!(record.created_at.is_none());
        assert_eq!(record.get(CREATED_AT_FIELD), Some(&json!(1714550400000_i64)));
        assert_eq!(record.to_fields()[CREATED_AT_FIELD], json!(1714550400000_i64));

        let decoded = Record::from_value(json!({"id": 3, "createdAt": 1714550400000_i64})).unwrap();
        assert!(decoded.created_at.is_none());
        assert_eq!(decoded.get(CREATED_AT_FIELD), Some(&json!(1714550400000_i64)));
        assert_eq!(
            serde_json::to_value(&decoded).unwrap(),
            json!({"id": 3, "createdAt": 1714550400000_i64})
        );

        let list: Vec<Record> = serde_json::from_value(json!([
            {"id": 1, "createdAt": "2024-05-01T09:00:00.000Z"},
            {"id": 2, "createdAt": 1714550400000_i64},
            {"id": 3, "createdAt": null}
        ]))
        .unwrap();
        assert_eq!(list.len(), 3);
        assert!(list[2].created_at.is_none());
        assert!(list[2].get(CREATED_AT_FIELD).is_none());
    }

    #[test]
    fn test_merged_overwrites_fields_but_not_id() {
        let record = Record::from_fields(fields(json!({"id": 42, "totalCost": "100.00", "pax": 2}))).unwrap();
        let merged = record.merged(&fields(json!({"id": 1, "totalCost": "150.00"})));
        assert_eq!(merged.id, RecordId::Int(42));
        assert_eq!(merged.get("totalCost"), Some(&json!("150.00")));
        assert_eq!(merged.get("pax"), Some(&json!(2)));
        assert_eq!(merged.created_at, record.created_at);
    }

    #[test]
    fn test_to_fields_round_trips_through_from_fields() {
        let record = Record::from_fields(fields(json!({"id": 5, "createdAt": "t", "hotel": "Mena House"}))).unwrap();
        let rebuilt = Record::from_fields(record.to_fields()).unwrap();
        assert_eq!(rebuilt, record);
    }
}
