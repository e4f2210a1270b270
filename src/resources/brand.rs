//! Brands.

use async_trait::async_trait;
use mongodb::bson::{Document, oid::ObjectId};
use serde_json::{Map, Value};

use super::{Resource, copy_fields};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::{Validator, slugify};

pub struct Brand;

fn build(body: &Map<String, Value>, creating: bool) -> Result<Document, AppError> {
    let mut v = Validator::new(body);
    let name = v.field("name");
    let name = if creating { name.required("Brand name required") } else { name };
    name.string("Brand name must be a string")
        .min_len(3, "Too short Brand name")
        .max_len(32, "Too long Brand name");
    v.field("image").string("Brand image must be a string");
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
impl Resource for Brand {
    const COLLECTION: &'static str = "brands";
    const LABEL: &'static str = "brand";
    const SINGULAR: &'static str = "brand";
    const PLURAL: &'static str = "brands";
    const CACHE_BUCKET: Option<&'static str> = Some("brands");
    const UNIQUE_FIELDS: &'static [&'static str] = &["name"];
    const IMAGE_FIELDS: &'static [&'static str] = &["image"];

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
