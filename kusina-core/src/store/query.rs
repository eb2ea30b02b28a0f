//! Structured queries understood by every [`RecordStore`](super::RecordStore).

use chrono::{DateTime, Utc};

use super::document::{Document, FieldValue};

/// What a filter applies to: a named field or the document identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Field(String),
    DocumentId,
}

impl FieldPath {
    pub fn field(name: impl Into<String>) -> Self {
        FieldPath::Field(name.into())
    }

    fn read(&self, doc: &Document) -> Option<FieldValue> {
        match self {
            FieldPath::Field(name) => doc.get(name).cloned(),
            FieldPath::DocumentId => Some(FieldValue::String(doc.id.clone())),
        }
    }
}

/// A single query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field == value`
    Eq { field: FieldPath, value: FieldValue },
    /// `start <= field < end` on a timestamp field; either bound may be open
    Range {
        field: String,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    /// `field in values`
    In {
        field: FieldPath,
        values: Vec<FieldValue>,
    },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Filter::Eq {
            field: FieldPath::field(field),
            value: value.into(),
        }
    }

    pub fn between(field: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Filter::Range {
            field: field.to_string(),
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn id_in(ids: &[String]) -> Self {
        Filter::In {
            field: FieldPath::DocumentId,
            values: ids.iter().cloned().map(FieldValue::String).collect(),
        }
    }

    pub fn field_in(field: &str, values: &[String]) -> Self {
        Filter::In {
            field: FieldPath::field(field),
            values: values.iter().cloned().map(FieldValue::String).collect(),
        }
    }

    /// Number of values in a membership filter, zero otherwise.
    pub fn membership_len(&self) -> usize {
        match self {
            Filter::In { values, .. } => values.len(),
            _ => 0,
        }
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => field.read(doc).as_ref() == Some(value),
            Filter::Range { field, start, end } => match doc.timestamp(field) {
                Some(ts) => {
                    start.map_or(true, |start| ts >= start) && end.map_or(true, |end| ts < end)
                }
                None => false,
            },
            Filter::In { field, values } => field
                .read(doc)
                .map_or(false, |found| values.contains(&found)),
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A collection query: all filters are AND-ed together.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Largest membership filter in the query.
    pub fn membership_len(&self) -> usize {
        self.filters
            .iter()
            .map(Filter::membership_len)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::fields;
    use chrono::TimeZone;

    fn order(id: &str, status: &str, ts: Option<DateTime<Utc>>) -> Document {
        let mut f = fields([("status", FieldValue::from(status))]);
        if let Some(ts) = ts {
            f.insert("createdAt".to_string(), FieldValue::Timestamp(ts));
        }
        Document::new("orders", id, f)
    }

    #[test]
    fn test_range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let filter = Filter::between("createdAt", start, end);

        assert!(filter.matches(&order("a", "completed", Some(start))));
        assert!(!filter.matches(&order("b", "completed", Some(end))));
        assert!(!filter.matches(&order("c", "completed", None)));
    }

    #[test]
    fn test_membership_on_document_id() {
        let filter = Filter::id_in(&["a".to_string(), "c".to_string()]);
        assert!(filter.matches(&order("a", "pending", None)));
        assert!(!filter.matches(&order("b", "pending", None)));
        assert_eq!(filter.membership_len(), 2);
    }

    #[test]
    fn test_eq_on_field() {
        let filter = Filter::eq("status", "completed");
        assert!(filter.matches(&order("a", "completed", None)));
        assert!(!filter.matches(&order("b", "pending", None)));
    }
}
