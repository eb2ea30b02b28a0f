//! Untyped documents as they come out of the store.
//!
//! A [`Document`] is an identifier plus a map of [`FieldValue`]s. Typed records
//! are decoded from documents through [`FromDocument`], which is where missing
//! required fields are rejected.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{Error, Result};

/// Field map of a document.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value, mirroring the store's value types.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view. Numeric strings are accepted since forms store prices as text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Timestamp view. Accepts native timestamps, RFC 3339 strings and epoch milliseconds.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            FieldValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            FieldValue::Integer(ms) => Utc.timestamp_millis_opt(*ms).single(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            FieldValue::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Ordering used by `order_by` and range filters. Values of different
    /// kinds are not comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (a, b) => match (a.number(), b.number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Fields> for FieldValue {
    fn from(value: Fields) -> Self {
        FieldValue::Map(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Fields`] map from `(name, value)` pairs.
pub fn fields<I, K, V>(pairs: I) -> Fields
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A document fetched from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        match self.fields.get(field) {
            Some(FieldValue::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Non-empty string field, trimmed.
    pub fn text(&self, field: &str) -> Option<String> {
        self.str(field)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).and_then(FieldValue::as_timestamp)
    }

    pub fn map(&self, field: &str) -> Option<&Fields> {
        self.get(field).and_then(FieldValue::as_map)
    }

    pub fn array(&self, field: &str) -> &[FieldValue] {
        self.get(field).and_then(FieldValue::as_array).unwrap_or(&[])
    }

    /// A non-empty string field that must be present.
    pub fn require_text(&self, field: &str) -> Result<String> {
        match self.get(field) {
            None => Err(Error::missing(&self.collection, &self.id, field)),
            Some(FieldValue::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(FieldValue::String(_)) => Err(Error::missing(&self.collection, &self.id, field)),
            Some(other) => Err(Error::invalid(
                &self.collection,
                &self.id,
                field,
                format!("expected string, got {:?}", other),
            )),
        }
    }
}

/// A typed record decoded from a store document.
pub trait FromDocument: Sized {
    /// Collection the record lives in.
    const COLLECTION: &'static str;

    /// Decode and validate a document.
    fn from_document(doc: &Document) -> Result<Self>;
}
