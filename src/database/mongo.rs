//! MongoDB document store.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOneOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, IndexModel};
use tracing::{debug, info};

use super::{DocumentStore, FindOptions, StoreError};

const DUPLICATE_KEY: i32 = 11000;

/// Document store backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: mongodb::Database,
}

impl MongoStore {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if the server cannot be reached; callers treat that as fatal.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);

        Ok(Self { client, db })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let find_options = mongodb::options::FindOptions::builder()
            .sort(options.sort_document())
            .skip(Some(options.skip))
            .limit(options.limit)
            .projection(options.projection.clone())
            .build();

        let cursor = self
            .collection(collection)
            .find(filter.clone())
            .with_options(find_options)
            .await?;

        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!("DB find on {}: {} documents", collection, docs.len());
        Ok(docs)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Document,
        projection: Option<&Document>,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOneOptions::builder()
            .projection(projection.cloned())
            .build();

        let result = self
            .collection(collection)
            .find_one(filter.clone())
            .with_options(options)
            .await?;
        Ok(result)
    }

    async fn count(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        Ok(self
            .collection(collection)
            .count_documents(filter.clone())
            .await?)
    }

    async fn insert(
        &self,
        collection: &str,
        mut document: Document,
    ) -> Result<Document, StoreError> {
        let result = self
            .collection(collection)
            .insert_one(&document)
            .await
            .map_err(map_write_error)?;
        // The driver only stamps its own serialized copy
        if !document.contains_key("_id") {
            document.insert("_id", result.inserted_id);
        }
        debug!("Inserted document into {}", collection);
        Ok(document)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        set: Document,
    ) -> Result<Option<Document>, StoreError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection(collection)
            .find_one_and_update(filter.clone(), doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(map_write_error)?;
        Ok(result)
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collection(collection)
            .find_one_and_delete(filter.clone())
            .await?)
    }

    async fn ensure_unique(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { field: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection(collection).create_index(index).await?;
        debug!("Ensured unique index {}.{}", collection, field);
        Ok(())
    }
}

/// Map duplicate-key failures to `StoreError::Duplicate`.
fn map_write_error(e: mongodb::error::Error) -> StoreError {
    let duplicate = match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY => {
            Some(we.message.clone())
        }
        ErrorKind::Command(ce) if ce.code == DUPLICATE_KEY => Some(ce.message.clone()),
        _ => None,
    };

    match duplicate {
        Some(message) => StoreError::Duplicate {
            value: duplicate_value(&message),
        },
        None => StoreError::Mongo(e),
    }
}

/// Pull the offending value out of `... dup key: { name: "Nike" }`.
fn duplicate_value(message: &str) -> String {
    let Some((_, rest)) = message.split_once("dup key: {") else {
        return message.to_string();
    };
    let inner = rest.trim_end().trim_end_matches('}').trim();
    let value = inner.split_once(':').map_or(inner, |(_, v)| v.trim());
    value.trim_matches('"').to_string()
}
