//! In-memory document store for offline runs and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use parking_lot::RwLock;
use tracing::debug;

use super::matcher;
use super::{DocumentStore, FindOptions, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `candidate` if a unique field collides with another document.
    fn check_unique(
        &self,
        collection: &str,
        docs: &[Document],
        candidate: &Document,
        skip: Option<&Bson>,
    ) -> Result<(), StoreError> {
        let unique = self.unique.read();
        let Some(fields) = unique.get(collection) else {
            return Ok(());
        };

        for field in fields {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let clash = docs
                .iter()
                .filter(|d| skip.is_none_or(|id| d.get("_id") != Some(id)))
                .any(|d| d.get(field) == Some(value));
            if clash {
                return Err(StoreError::Duplicate {
                    value: display(value),
                });
            }
        }
        Ok(())
    }
}

fn display(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = {
            let collections = self.collections.read();
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| matcher::matches(d, filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        matcher::sort(&mut docs, &options.sort);

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = match options.limit {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => usize::MAX,
        };

        Ok(docs
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|d| match &options.projection {
                Some(p) => matcher::project(d, p),
                None => d,
            })
            .collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read();
        let found = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matcher::matches(d, filter)))
            .cloned();
        Ok(match (found, projection) {
            (Some(d), Some(p)) => Some(matcher::project(d, p)),
            (found, _) => found,
        })
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map_or(0, |docs| {
                docs.iter().filter(|d| matcher::matches(d, filter)).count()
            }) as u64)
    }

    async fn insert(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        if !document.contains_key("_id") {
            document.insert("_id", ObjectId::new());
        }

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        self.check_unique(collection, docs, &document, None)?;
        docs.push(document.clone());
        debug!("Inserted document into {} (memory)", collection);
        Ok(document)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = docs.iter().position(|d| matcher::matches(d, filter)) else {
            return Ok(None);
        };

        let mut updated = docs[index].clone();
        for (key, value) in set {
            updated.insert(key, value);
        }
        self.check_unique(collection, docs, &updated, docs[index].get("_id"))?;
        docs[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|d| matcher::matches(d, filter))
            .map(|index| docs.remove(index)))
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.unique
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        Ok(())
    }
}
