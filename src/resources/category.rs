//! Categories.

use async_trait::async_trait;
use mongodb::bson::{Document, oid::ObjectId};
use serde_json::{Map, Value};

use super::{Relation, Resource, copy_fields};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::{Validator, slugify};

pub struct Category;

fn build(body: &Map<String, Value>, creating: bool) -> Result<Document, AppError> {
    let mut v = Validator::new(body);
    let name = v.field("name");
    let name = if creating { name.required("category name required") } else { name };
    name.string("category name must be a string")
        .min_len(3, "Too short category name")
        .max_len(32, "Too long category name");
    v.field("image").string("category image must be a string");
    v.finish()?;

    let mut doc = Document::new();
    copy_fields(body, &["name", "image"], &mut doc);
    if let Ok(name) = doc.get_str("name") {
        let slug = slugify(name);
        doc.insert("slug", slug);
    }
    Ok(doc)
}

#[async_trait]
impl Resource for Category {
    const COLLECTION: &'static str = "categories";
    const LABEL: &'static str = "category";
    const SINGULAR: &'static str = "category";
    const PLURAL: &'static str = "categories";
    const CACHE_BUCKET: Option<&'static str> = Some("categories");
    const UNIQUE_FIELDS: &'static [&'static str] = &["name"];
    const IMAGE_FIELDS: &'static [&'static str] = &["image"];
    const RELATION: Option<Relation> = Some(Relation {
        field: "subCategories",
        collection: "subcategories",
        foreign_field: "category",
        bucket: Some("subcategories"),
    });

    async fn prepare_create(
        body: Map<String, Value>,
        _state: &AppState,
    ) -> Result<Document, AppError> {
        build(&body, true)
    }

    async fn prepare_update(
        _id: ObjectId,
        body: Map<String, Value>,
        _state: &AppState,
    ) -> Result<Document, AppError> {
        build(&body, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_rules() {
        let body = |v: Value| v.as_object().cloned().unwrap();

        let err = build(&body(json!({ "name": "ab" })), true).unwrap_err();
        assert_eq!(err.to_string(), "Too short category name");

        let err = build(&body(json!({ "name": "x".repeat(33) })), false).unwrap_err();
        assert_eq!(err.to_string(), "Too long category name");

        let err = build(&body(json!({})), true).unwrap_err();
        assert_eq!(err.to_string(), "category name required");

        let doc = build(&body(json!({ "name": "Test Category" })), true).unwrap();
        assert_eq!(doc.get_str("slug").unwrap(), "test-category");
    }
}
