//! Read queries as values.
//!
//! A `Query` is built by a handler, optionally routed through the query
//! cache, and finally executed against a `DocumentStore`.

use mongodb::bson::Document;

use super::{DocumentStore, StoreError};

/// Sort, pagination and projection for a `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Ordered `(field, direction)` pairs; direction is `1` or `-1`.
    pub sort: Vec<(String, i32)>,
    pub skip: u64,
    pub limit: Option<i64>,
    pub projection: Option<Document>,
}

impl FindOptions {
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        for (field, direction) in &self.sort {
            doc.insert(field.clone(), *direction);
        }
        Some(doc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Find {
        collection: String,
        filter: Document,
        options: FindOptions,
    },
    FindOne {
        collection: String,
        filter: Document,
        projection: Option<Document>,
    },
    Count {
        collection: String,
        filter: Document,
    },
}

/// What a query produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Many(Vec<Document>),
    One(Option<Document>),
    Count(u64),
}

impl Query {
    pub fn find(collection: &str, filter: Document, options: FindOptions) -> Self {
        Self::Find {
            collection: collection.to_string(),
            filter,
            options,
        }
    }

    pub fn find_one(collection: &str, filter: Document) -> Self {
        Self::FindOne {
            collection: collection.to_string(),
            filter,
            projection: None,
        }
    }

    pub fn count(collection: &str, filter: Document) -> Self {
        Self::Count {
            collection: collection.to_string(),
            filter,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            Self::Find { collection, .. }
            | Self::FindOne { collection, .. }
            | Self::Count { collection, .. } => collection,
        }
    }

    /// Run directly against the store.
    pub async fn execute(&self, store: &dyn DocumentStore) -> Result<QueryOutput, StoreError> {
        match self {
            Self::Find {
                collection,
                filter,
                options,
            } => Ok(QueryOutput::Many(store.find(collection, filter, options).await?)),
            Self::FindOne {
                collection,
                filter,
                projection,
            } => Ok(QueryOutput::One(
                store.find_one(collection, filter, projection.as_ref()).await?,
            )),
            Self::Count { collection, filter } => {
                Ok(QueryOutput::Count(store.count(collection, filter).await?))
            }
        }
    }
}

impl QueryOutput {
    pub fn into_many(self) -> Vec<Document> {
        match self {
            Self::Many(docs) => docs,
            Self::One(doc) => doc.into_iter().collect(),
            Self::Count(_) => Vec::new(),
        }
    }

    pub fn into_one(self) -> Option<Document> {
        match self {
            Self::One(doc) => doc,
            Self::Many(docs) => docs.into_iter().next(),
            Self::Count(_) => None,
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            Self::Count(n) => *n,
            Self::Many(docs) => docs.len() as u64,
            Self::One(doc) => u64::from(doc.is_some()),
        }
    }
}
