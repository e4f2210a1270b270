//! Subcategories, each belonging to one category.

use async_trait::async_trait;
use mongodb::bson::{Document, oid::ObjectId};
use serde_json::{Map, Value};

use super::{Category, Resource, body_object_id, copy_fields, exists};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::{Validator, slugify};

pub struct SubCategory;

async fn build(
    body: &Map<String, Value>,
    creating: bool,
    state: &AppState,
) -> Result<Document, AppError> {
    let mut v = Validator::new(body);
    let name = v.field("name");
    let name = if creating { name.required("Subcategory name required") } else { name };
    name.string("Subcategory name must be a string")
        .min_len(2, "Too short Subcategory name")
        .max_len(32, "Too long Subcategory name");
    let category = v.field("category");
    let category = if creating {
        category.required("sub category must belong to category")
    } else {
        category
    };
    category.object_id("invalid category id");
    v.finish()?;

    let mut doc = Document::new();
    copy_fields(body, &["name"], &mut doc);
    if let Ok(name) = doc.get_str("name") {
        let slug = slugify(name);
        doc.insert("slug", slug);
    }

    if let Some(category) = body_object_id(body, "category") {
        if !exists(state.store.as_ref(), Category::COLLECTION, category).await? {
            return Err(AppError::BadRequest(format!(
                "No category for this id: {category}"
            )));
        }
        doc.insert("category", category);
    }
    Ok(doc)
}

#[async_trait]
impl Resource for SubCategory {
    const COLLECTION: &'static str = "subcategories";
    const LABEL: &'static str = "subcategory";
    const SINGULAR: &'static str = "subCategory";
    const PLURAL: &'static str = "subCategories";
    const CACHE_BUCKET: Option<&'static str> = Some("subcategories");
    const UNIQUE_FIELDS: &'static [&'static str] = &["name"];

    async fn prepare_create(
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError> {
        build(&body, true, state).await
    }

    async fn prepare_update(
        _id: ObjectId,
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError> {
        build(&body, false, state).await
    }
}
