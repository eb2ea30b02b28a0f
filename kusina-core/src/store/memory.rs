//! In-memory record store.
//!
//! Evaluates queries the way the hosted store does (AND-ed filters, documents
//! without the `order_by` field are dropped, membership filters are capped)
//! and keeps a log of the queries it served.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::Session;
use crate::error::{Error, Result};

use super::document::{Document, Fields};
use super::query::{Direction, Query};
use super::RecordStore;

/// Membership cap of the hosted store.
const DEFAULT_MAX_IN_VALUES: usize = 10;

pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Fields>>>,
    query_log: Mutex<Vec<Query>>,
    denied: Mutex<HashSet<String>>,
    max_in_values: usize,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_in_limit(DEFAULT_MAX_IN_VALUES)
    }

    /// Store that rejects membership filters with more than `max_in_values` values.
    pub fn with_in_limit(max_in_values: usize) -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            query_log: Mutex::new(Vec::new()),
            denied: Mutex::new(HashSet::new()),
            max_in_values,
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed a document.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        let mut collections = lock(&self.collections);
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// All documents of a collection, ordered by id.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = lock(&self.collections);
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, f)| Document::new(collection, id.clone(), f.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Queries served so far, in arrival order.
    pub fn queries(&self) -> Vec<Query> {
        lock(&self.query_log).clone()
    }

    /// Make every request against `collection` fail with a permission error.
    pub fn deny(&self, collection: &str) {
        lock(&self.denied).insert(collection.to_string());
    }

    fn check_access(&self, session: &Session, collection: &str) -> Result<()> {
        if session.is_expired(Utc::now()) {
            return Err(Error::Permission("session token expired".to_string()));
        }
        if lock(&self.denied).contains(collection) {
            return Err(Error::Permission(format!(
                "missing or insufficient permissions for {}",
                collection
            )));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn run_query(&self, session: &Session, query: &Query) -> Result<Vec<Document>> {
        self.check_access(session, &query.collection)?;

        if query.membership_len() > self.max_in_values {
            return Err(Error::Store(format!(
                "membership filter supports at most {} values, got {}",
                self.max_in_values,
                query.membership_len()
            )));
        }

        lock(&self.query_log).push(query.clone());

        let mut matched: Vec<Document> = self
            .documents(&query.collection)
            .into_iter()
            .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matched.retain(|doc| doc.get(field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => x.compare(y).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                };
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn get(&self, session: &Session, collection: &str, id: &str) -> Result<Option<Document>> {
        self.check_access(session, collection)?;
        let collections = lock(&self.collections);
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|f| Document::new(collection, id, f.clone())))
    }

    async fn create(&self, session: &Session, collection: &str, fields: Fields) -> Result<String> {
        self.check_access(session, collection)?;
        let id = format!("auto-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.insert(collection, &id, fields);
        Ok(id)
    }

    async fn update(
        &self,
        session: &Session,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<()> {
        self.check_access(session, collection)?;
        let mut collections = lock(&self.collections);
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.extend(fields);
        Ok(())
    }

    async fn delete(&self, session: &Session, collection: &str, id: &str) -> Result<()> {
        self.check_access(session, collection)?;
        let mut collections = lock(&self.collections);
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::{fields, FieldValue};
    use crate::store::query::Filter;

    fn session() -> Session {
        Session::offline("admin")
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, price) in [("a", 3.0), ("b", 1.0), ("c", 2.0)] {
            store.insert("dishes", id, fields([("price", FieldValue::Double(price))]));
        }
        store.insert("dishes", "d", fields([("name", FieldValue::from("no price"))]));
        store
    }

    #[tokio::test]
    async fn test_order_by_drops_missing_field() {
        let store = seeded();
        let query = Query::new("dishes").order_by("price", Direction::Descending);
        let docs = store.run_query(&session(), &query).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_membership_cap_enforced() {
        let store = MemoryStore::with_in_limit(2);
        let ids: Vec<String> = (0..3).map(|i| i.to_string()).collect();
        let query = Query::new("users").filter(Filter::id_in(&ids));
        let err = store.run_query(&session(), &query).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(store.queries().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = seeded();
        let mut patch = Fields::new();
        patch.insert("imageUrl".to_string(), FieldValue::from("a.png"));
        store.update(&session(), "dishes", "a", patch).await.unwrap();

        let doc = store.get(&session(), "dishes", "a").await.unwrap().unwrap();
        assert_eq!(doc.f64("price"), Some(3.0));
        assert_eq!(doc.str("imageUrl"), Some("a.png"));

        let missing = store
            .update(&session(), "dishes", "zzz", Fields::new())
            .await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_denied_collection() {
        let store = seeded();
        store.deny("dishes");
        let err = store
            .run_query(&session(), &Query::new("dishes"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let store = MemoryStore::new();
        let a = store.create(&session(), "restaurants", Fields::new()).await.unwrap();
        let b = store.create(&session(), "restaurants", Fields::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.documents("restaurants").len(), 2);
    }
}
