use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

/// A scalar produced by field extraction, or a label resolved from a lookup
/// table. `Json` only appears when a nested lookup entry had neither a
/// `name` nor a `value` member and is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Json(v) => v.to_string(),
        }
    }

    /// Blank strings count as absent, mirroring how empty source cells are read.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::String(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

/// One extracted row keyed by target column.
///
/// Every mapped column is present (possibly as `None`); label columns added
/// by enrichment are only present when a lookup succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: BTreeMap<String, Option<Value>>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: Option<Value>) {
        self.fields.insert(column.into(), value);
    }

    /// Returns the non-null value of `column`, if any.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column).and_then(Option::as_ref)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).is_none_or(Value::is_blank)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_flattens_null_columns() {
        let mut record = FlatRecord::new();
        record.set("postcode", Some(Value::from("SW1A 1AA")));
        record.set("latitude", None);

        assert_eq!(record.get_str("postcode"), Some("SW1A 1AA"));
        assert!(record.contains("latitude"));
        assert!(record.get("latitude").is_none());
        assert!(record.is_null("latitude"));
        assert!(record.is_null("missing"));
    }

    #[test]
    fn blank_strings_are_null() {
        let mut record = FlatRecord::new();
        record.set("date_of_termination", Some(Value::from("  ")));
        assert!(record.is_null("date_of_termination"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut record = FlatRecord::new();
        record.set("eastings", Some(Value::Integer(529090)));
        record.set("latitude", None);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"eastings":529090,"latitude":null}"#);
    }
}
