//! Instrumented store for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mongodb::bson::Document;
use parking_lot::Mutex;

use super::{DocumentStore, FindOptions, MemoryStore, StoreError};

/// Wraps a `MemoryStore`, counts read calls and keeps every document
/// exactly as it was handed to `insert`.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
    inserted: Mutex<Vec<Document>>,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            inserted: Mutex::new(Vec::new()),
        }
    }

    /// Number of `find`/`find_one`/`count` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Documents received by `insert`, before the inner store touched them.
    pub fn inserted(&self) -> Vec<Document> {
        self.inserted.lock().clone()
    }

    fn hit(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.find(collection, filter, options).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.find_one(collection, filter, projection).await
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        self.hit();
        self.inner.count(collection, filter).await
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        self.inserted.lock().push(document.clone());
        self.inner.insert(collection, document).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.update_one(collection, filter, set).await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        self.inner.delete_one(collection, filter).await
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.inner.ensure_unique(collection, field).await
    }
}
