//! Resource descriptors for the generic CRUD handlers.
//!
//! Each entity declares where it lives, how it is cached, how it is
//! searched and rendered, and how request bodies become documents.

mod brand;
mod category;
mod product;
mod subcategory;
mod user;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use serde_json::{Map, Value};
use tracing::info;

use crate::database::{DocumentStore, StoreError};
use crate::error::AppError;
use crate::server::AppState;

pub use brand::Brand;
pub use category::Category;
pub use product::Product;
pub use subcategory::SubCategory;
pub use user::{UserAccount, new_account, user_self_update};

/// Documents in another collection embedded on single-document reads,
/// e.g. a category's subcategories.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Key the related documents are embedded under.
    pub field: &'static str,
    pub collection: &'static str,
    /// Field in the related collection holding this document's `_id`.
    pub foreign_field: &'static str,
    /// Cache bucket for the related read.
    pub bucket: Option<&'static str>,
}

#[async_trait]
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Lowercase name used in messages, e.g. `Invalid product ID format`.
    const LABEL: &'static str;
    /// Envelope key for one document.
    const SINGULAR: &'static str;
    /// Envelope key for a list.
    const PLURAL: &'static str;
    /// Cache bucket for reads; every successful write clears it.
    const CACHE_BUCKET: Option<&'static str>;

    /// Fields matched by `?keyword=`.
    const SEARCH_FIELDS: &'static [&'static str] = &["name"];
    const UNIQUE_FIELDS: &'static [&'static str] = &[];
    /// Stored file names rendered as URLs.
    const IMAGE_FIELDS: &'static [&'static str] = &[];
    /// Never rendered.
    const HIDDEN_FIELDS: &'static [&'static str] = &[];
    const RELATION: Option<Relation> = None;

    /// Filter applied to every read and write.
    fn scope() -> Document {
        Document::new()
    }

    /// Validate a create body and build the document to insert.
    async fn prepare_create(
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError>;

    /// Validate an update body and build the `$set` document.
    async fn prepare_update(
        id: ObjectId,
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError>;
}

/// Declare unique fields for every resource.
pub async fn ensure_indexes(store: &dyn DocumentStore) -> Result<(), StoreError> {
    async fn declare<R: Resource>(store: &dyn DocumentStore) -> Result<(), StoreError> {
        for field in R::UNIQUE_FIELDS {
            store.ensure_unique(R::COLLECTION, field).await?;
        }
        Ok(())
    }

    declare::<Product>(store).await?;
    declare::<Category>(store).await?;
    declare::<SubCategory>(store).await?;
    declare::<Brand>(store).await?;
    declare::<UserAccount>(store).await?;
    info!("Unique indexes ensured");
    Ok(())
}

/// Convert a JSON body value to BSON, keeping integers integral.
pub fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Bson::Int64(i),
            None => Bson::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), to_bson(v)))
                .collect(),
        ),
    }
}

/// Copy the listed fields that are present in `body`.
pub fn copy_fields(body: &Map<String, Value>, fields: &[&str], out: &mut Document) {
    for field in fields {
        if let Some(value) = body.get(*field) {
            let value = match value {
                Value::String(s) => Bson::String(s.trim().to_string()),
                other => to_bson(other),
            };
            out.insert(*field, value);
        }
    }
}

/// Parse an id already checked by a validator rule.
pub fn body_object_id(body: &Map<String, Value>, field: &str) -> Option<ObjectId> {
    body.get(field)
        .and_then(Value::as_str)
        .and_then(|s| ObjectId::parse_str(s).ok())
}

/// Whether a document with this id exists. Reference checks always read
/// the store directly.
pub async fn exists(
    store: &dyn DocumentStore,
    collection: &str,
    id: ObjectId,
) -> Result<bool, AppError> {
    Ok(store
        .find_one(collection, &doc! { "_id": id }, Some(&doc! { "_id": 1 }))
        .await?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_bson_keeps_number_kinds() {
        assert_eq!(to_bson(&json!(200)), Bson::Int64(200));
        assert_eq!(to_bson(&json!(19.5)), Bson::Double(19.5));
        assert_eq!(
            to_bson(&json!(["a", 1])),
            Bson::Array(vec![Bson::String("a".into()), Bson::Int64(1)])
        );
    }

    #[test]
    fn test_copy_fields_trims_and_filters() {
        let body = json!({ "name": "  Nike ", "role": "admin" });
        let mut out = Document::new();
        copy_fields(body.as_object().unwrap(), &["name", "image"], &mut out);
        assert_eq!(out, doc! { "name": "Nike" });
    }
}
