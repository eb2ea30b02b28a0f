//! Document store access
//!
//! The dashboard reads and writes a hosted document database. Everything goes
//! through the [`RecordStore`] trait so reports can run against the REST
//! backend or an in-memory store with the same code.
//!
//! ## Backends
//!
//! - [`FirestoreStore`] - REST client for the hosted database
//! - [`MemoryStore`] - process-local store used by tests and offline runs
//!
//! Every call takes the caller's [`Session`]; there is no ambient "current user".

mod document;
mod firestore;
mod memory;
mod query;

pub use document::{fields, Document, FieldValue, Fields, FromDocument};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use query::{Direction, FieldPath, Filter, Query};

use async_trait::async_trait;

use crate::auth::Session;
use crate::error::Result;

/// Collection names used by the dashboard.
pub mod collections {
    pub const ORDERS: &str = "orders";
    pub const INTERACTIONS: &str = "interactions";
    pub const VIDEOS: &str = "videos";
    pub const USERS: &str = "users";
    pub const DISHES: &str = "dishes";
    pub const RESTAURANTS: &str = "restaurants";
    pub const APPLICATIONS: &str = "applications";
    pub const REPORTS: &str = "reports";
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Run a structured query and return matching documents.
    async fn run_query(&self, session: &Session, query: &Query) -> Result<Vec<Document>>;

    /// Fetch a single document, `None` if it does not exist.
    async fn get(&self, session: &Session, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create a document with a store-assigned id and return the id.
    async fn create(&self, session: &Session, collection: &str, fields: Fields) -> Result<String>;

    /// Set the given fields on an existing document, leaving other fields untouched.
    async fn update(
        &self,
        session: &Session,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<()>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, session: &Session, collection: &str, id: &str) -> Result<()>;
}
