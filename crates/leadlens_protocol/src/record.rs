//! Schema-less enrichment records.
//!
//! The enrichment service returns an arbitrary JSON object. It is decoded once
//! into a tagged value tree so presentation code dispatches on the variant
//! instead of inspecting JSON types at render time.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Leaf value of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
    Null,
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => write!(f, "null"),
        }
    }
}

/// A record field value.
///
/// Sequences normally hold scalars; nested values inside a sequence are kept
/// rather than rejected so no server data is dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Scalar(Scalar),
    Sequence(Vec<RecordValue>),
    Mapping(IndexMap<String, RecordValue>),
}

impl RecordValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[RecordValue]> {
        match self {
            RecordValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, RecordValue>> {
        match self {
            RecordValue::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Convert back to plain JSON.
    pub fn to_json(&self) -> Value {
        match self {
            RecordValue::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            RecordValue::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            RecordValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            RecordValue::Scalar(Scalar::Null) => Value::Null,
            RecordValue::Sequence(items) => {
                Value::Array(items.iter().map(RecordValue::to_json).collect())
            }
            RecordValue::Mapping(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for RecordValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RecordValue::Scalar(Scalar::Text(s)),
            Value::Number(n) => RecordValue::Scalar(Scalar::Number(n)),
            Value::Bool(b) => RecordValue::Scalar(Scalar::Bool(b)),
            Value::Null => RecordValue::Scalar(Scalar::Null),
            Value::Array(items) => {
                RecordValue::Sequence(items.into_iter().map(RecordValue::from).collect())
            }
            Value::Object(map) => RecordValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, RecordValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// The enrichment record: field name to value, in the order the service sent
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, RecordValue>,
}

impl Record {
    /// Decode a JSON value; only objects are records.
    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, RecordValue::from(v)))
                    .collect(),
            }),
            other => Err(RecordError::NotAnObject(json_kind(&other))),
        }
    }

    /// Decode a raw response body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| RecordError::InvalidJson(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecordValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `company_name` when the service provides a non-empty string.
    pub fn company_name(&self) -> Option<&str> {
        self.text_field("company_name")
    }

    /// `profile_photo` URL when the service provides a non-empty string.
    pub fn profile_photo(&self) -> Option<&str> {
        self.text_field("profile_photo")
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(RecordValue::as_text)
            .filter(|s| !s.is_empty())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
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
    fn decodes_scalars_sequences_and_mappings() {
        let record = Record::from_json(json!({
            "company_name": "Acme",
            "tags": ["a", "b"],
            "employees": 120,
            "public": false,
            "hq": {"city": "Berlin", "country": "DE"},
            "founded": null
        }))
        .unwrap();

        assert_eq!(record.company_name(), Some("Acme"));
        let tags = record.get("tags").and_then(RecordValue::as_sequence).unwrap();
        assert_eq!(
            tags,
            &[
                RecordValue::Scalar(Scalar::Text("a".into())),
                RecordValue::Scalar(Scalar::Text("b".into())),
            ]
        );
        let hq = record.get("hq").and_then(RecordValue::as_mapping).unwrap();
        assert_eq!(hq.get("city").and_then(RecordValue::as_text), Some("Berlin"));
        assert_eq!(record.get("founded"), Some(&RecordValue::Scalar(Scalar::Null)));
        assert_eq!(record.len(), 6);
    }

    #[test]
    fn non_objects_are_rejected() {
        assert_eq!(
            Record::from_json(json!(["a"])),
            Err(RecordError::NotAnObject("array"))
        );
        assert_eq!(
            Record::from_json(json!("ok")),
            Err(RecordError::NotAnObject("string"))
        );
        assert_eq!(Record::from_json(Value::Null), Err(RecordError::NotAnObject("null")));
        assert!(matches!(
            Record::from_slice(b"not json"),
            Err(RecordError::InvalidJson(_))
        ));
    }

    #[test]
    fn serializes_back_to_the_same_json() {
        let original = json!({"a": [1, "x", true], "b": {"c": null}});
        let record = Record::from_json(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), original);
        assert_eq!(record.to_json(), original);
    }

    #[test]
    fn keeps_server_field_order() {
        let record = Record::from_slice(
            br#"{"zeta": 1, "company_name": "Acme", "alpha": {"y": 1, "b": 2}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "company_name", "alpha"]);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"zeta":1,"company_name":"Acme","alpha":{"y":1,"b":2}}"#
        );
    }

    #[test]
    fn empty_presentation_fields_are_absent() {
        let record = Record::from_json(json!({"company_name": "", "profile_photo": 3})).unwrap();
        assert_eq!(record.company_name(), None);
        assert_eq!(record.profile_photo(), None);
    }
}
