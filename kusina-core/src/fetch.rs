//! Typed record fetching
//!
//! [`Fetcher`] sits between the reports and a [`RecordStore`]. It decodes
//! every document into its record type (so a missing required field fails
//! here, not halfway through an aggregation) and splits identifier-membership
//! filters into batches the store accepts.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::store::{Document, Filter, FromDocument, Query, RecordStore};

/// Default size of one membership batch.
pub const DEFAULT_IN_BATCH_SIZE: usize = 10;

/// Default number of membership batches in flight at once.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 4;

/// Query front-end bound to one session.
pub struct Fetcher<'a> {
    store: &'a dyn RecordStore,
    session: &'a Session,
    in_batch_size: usize,
    max_concurrent_batches: usize,
}

impl<'a> Fetcher<'a> {
    pub fn new(store: &'a dyn RecordStore, session: &'a Session) -> Self {
        Self {
            store,
            session,
            in_batch_size: DEFAULT_IN_BATCH_SIZE,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
        }
    }

    pub fn with_batch_size(mut self, in_batch_size: usize) -> Self {
        self.in_batch_size = in_batch_size.max(1);
        self
    }

    pub fn with_max_concurrent_batches(mut self, max_concurrent_batches: usize) -> Self {
        self.max_concurrent_batches = max_concurrent_batches.max(1);
        self
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn store(&self) -> &'a dyn RecordStore {
        self.store
    }

    /// Fetch every `T` matching all `filters`.
    pub async fn fetch<T: FromDocument>(&self, filters: Vec<Filter>) -> Result<Vec<T>> {
        self.fetch_query(Query::new(T::COLLECTION).filters(filters))
            .await
    }

    /// Run a prepared query against `T`'s collection.
    pub async fn fetch_query<T: FromDocument>(&self, query: Query) -> Result<Vec<T>> {
        if query.collection != T::COLLECTION {
            return Err(Error::Validation(format!(
                "query targets {} but records are read from {}",
                query.collection,
                T::COLLECTION
            )));
        }
        let docs = self.run(&query).await?;
        decode_all(&docs)
    }

    /// Fetch one record by id.
    pub async fn get<T: FromDocument>(&self, id: &str) -> Result<Option<T>> {
        match self.store.get(self.session, T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(T::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// Fetch records by document id, batching the membership filter.
    ///
    /// Ids are de-duplicated first; the result follows batch order and
    /// never contains the same document twice.
    pub async fn fetch_by_ids<T: FromDocument>(&self, ids: &[String]) -> Result<Vec<T>> {
        let queries = membership_batches(ids, self.in_batch_size)
            .into_iter()
            .map(|batch| Query::new(T::COLLECTION).filter(Filter::id_in(&batch)))
            .collect();
        self.fetch_batched(queries).await
    }

    /// Fetch records whose `field` is any of `values`, AND-ed with `extra`.
    pub async fn fetch_where_in<T: FromDocument>(
        &self,
        field: &str,
        values: &[String],
        extra: Vec<Filter>,
    ) -> Result<Vec<T>> {
        let queries = membership_batches(values, self.in_batch_size)
            .into_iter()
            .map(|batch| {
                Query::new(T::COLLECTION)
                    .filters(extra.iter().cloned())
                    .filter(Filter::field_in(field, &batch))
            })
            .collect();
        self.fetch_batched(queries).await
    }

    async fn fetch_batched<T: FromDocument>(&self, queries: Vec<Query>) -> Result<Vec<T>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            batches = queries.len(),
            concurrency = self.max_concurrent_batches,
            "Fetching membership batches"
        );

        // buffered keeps input order regardless of completion order
        let batches: Vec<Vec<Document>> = stream::iter(queries.iter().map(|q| self.run(q)))
            .buffered(self.max_concurrent_batches)
            .try_collect()
            .await?;

        let mut seen = HashSet::new();
        let docs: Vec<Document> = batches
            .into_iter()
            .flatten()
            .filter(|doc| seen.insert(doc.id.clone()))
            .collect();
        decode_all(&docs)
    }

    async fn run(&self, query: &Query) -> Result<Vec<Document>> {
        let docs = self
            .store
            .run_query(self.session, query)
            .await
            .map_err(|e| {
                tracing::warn!(collection = %query.collection, error = %e, "Query failed");
                e
            })?;
        tracing::debug!(
            collection = %query.collection,
            filters = query.filters.len(),
            count = docs.len(),
            "Query returned documents"
        );
        Ok(docs)
    }
}

fn decode_all<T: FromDocument>(docs: &[Document]) -> Result<Vec<T>> {
    docs.iter().map(T::from_document).collect()
}

/// De-duplicate `values` (first occurrence wins) and split into chunks of
/// at most `size`.
pub fn membership_batches(values: &[String], size: usize) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let unique: Vec<String> = values
        .iter()
        .filter(|v| seen.insert(v.as_str()))
        .cloned()
        .collect();
    unique
        .chunks(size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
