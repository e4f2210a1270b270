//! Document store abstraction.
//!
//! Handlers and the query cache talk to storage only through this trait,
//! so MongoDB and the in-memory store are interchangeable.

use async_trait::async_trait;
use mongodb::bson::Document;

use super::{FindOptions, StoreError};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError>;

    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

    /// `$set` the given fields on the first match and return the updated document.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove the first match and return it.
    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Declare a field whose values must be unique within the collection.
    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError>;
}
