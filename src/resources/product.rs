//! Products.

use async_trait::async_trait;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde_json::{Map, Value};

use super::{Brand, Category, Resource, SubCategory, body_object_id, copy_fields, exists};
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::{Validator, slugify};

pub struct Product;

const PLAIN_FIELDS: &[&str] = &[
    "name",
    "description",
    "quantity",
    "sold",
    "price",
    "priceAfterDiscount",
    "colors",
    "imageCover",
    "images",
    "ratingsAverage",
    "ratingsQuantity",
];

/// Field rules shared by create and update; `required` only on create.
fn validate(body: &Map<String, Value>, creating: bool) -> Result<(), AppError> {
    let mut v = Validator::new(body);

    macro_rules! field {
        ($name:expr, $required:expr) => {{
            let f = v.field($name);
            if creating { f.required($required) } else { f }
        }};
    }

    field!("name", "Product name is required")
        .string("Product name must be a string")
        .min_len(3, "Too short product name")
        .max_len(100, "Too long product name");
    field!("description", "Product description is required")
        .string("Product description must be a string")
        .max_len(2000, "Too long product description");
    field!("quantity", "Product quantity is required")
        .number("Product quantity must be a number")
        .integer("Product quantity must be an integer")
        .min(0.0, "Product quantity must be greater than or equal to 0");
    field!("price", "Product price is required")
        .number("Product price must be a number")
        .min(0.0, "Product price must be greater than or equal to 0");
    field!("category", "Product must belong to a category")
        .object_id("Invalid category ID format");

    v.field("sold")
        .number("Product sold must be a number")
        .integer("Product sold must be an integer")
        .min(0.0, "Product sold must be greater than or equal to 0");
    let discount_ok = v
        .field("priceAfterDiscount")
        .number("Product priceAfterDiscount must be a number")
        .min(0.0, "Product priceAfterDiscount must be greater than or equal to 0")
        .valid();
    v.field("colors").array("Product colors must be an array of strings");
    v.field("imageCover").string("Product imageCover must be a string");
    v.field("images").array("Product images must be an array of strings");
    v.field("brand").object_id("Invalid brand ID format");
    v.field("subcategories").array("One or more subcategory IDs are invalid.");
    v.field("ratingsAverage")
        .number("Rating must be a number")
        .min(1.0, "Rating must be above or equal 1.0")
        .max(5.0, "Rating must be below or equal 5.0");
    v.field("ratingsQuantity")
        .number("Ratings quantity must be a number")
        .integer("Ratings quantity must be an integer")
        .min(0.0, "Ratings quantity must be greater than or equal to 0");

    if discount_ok {
        let price = body.get("price").and_then(Value::as_f64);
        let discount = body.get("priceAfterDiscount").and_then(Value::as_f64);
        if let (Some(price), Some(discount)) = (price, discount)
            && discount > price
        {
            v.reject("priceAfterDiscount must be lower than price");
        }
    }

    for (field, label) in [("colors", "colors"), ("images", "images")] {
        let all_strings = body
            .get(field)
            .and_then(Value::as_array)
            .is_none_or(|items| items.iter().all(Value::is_string));
        if !all_strings {
            v.reject(format!("Product {label} must be an array of strings"));
        }
    }

    v.finish()
}

/// Parse `subcategories`, all-or-nothing.
fn subcategory_ids(body: &Map<String, Value>) -> Result<Option<Vec<ObjectId>>, AppError> {
    let Some(items) = body.get("subcategories").and_then(Value::as_array) else {
        return Ok(None);
    };
    items
        .iter()
        .map(|item| item.as_str().and_then(|s| ObjectId::parse_str(s).ok()))
        .collect::<Option<Vec<_>>>()
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("One or more subcategory IDs are invalid.".into()))
}

async fn build(
    body: &Map<String, Value>,
    creating: bool,
    state: &AppState,
) -> Result<Document, AppError> {
    validate(body, creating)?;
    let subcategories = subcategory_ids(body)?;
    let store = state.store.as_ref();

    let mut doc = Document::new();
    copy_fields(body, PLAIN_FIELDS, &mut doc);
    if let Ok(name) = doc.get_str("name") {
        let slug = slugify(name);
        doc.insert("slug", slug);
    }

    let category = body_object_id(body, "category");
    if let Some(category) = category {
        if !exists(store, Category::COLLECTION, category).await? {
            return Err(AppError::BadRequest(format!(
                "No category for this id: {category}"
            )));
        }
        doc.insert("category", category);
    }

    if let Some(brand) = body_object_id(body, "brand") {
        if !exists(store, Brand::COLLECTION, brand).await? {
            return Err(AppError::BadRequest(format!("No brand with this id {brand}")));
        }
        doc.insert("brand", brand);
    }

    if let Some(ids) = subcategories {
        if !ids.is_empty() {
            let mut filter = doc! { "_id": { "$in": ids.clone() } };
            let found = store.count(SubCategory::COLLECTION, &filter).await?;
            let unique: std::collections::HashSet<_> = ids.iter().collect();
            if found != unique.len() as u64 {
                return Err(AppError::BadRequest(
                    "One or more subcategory IDs do not exist".into(),
                ));
            }
            if let Some(category) = category {
                filter.insert("category", category);
                if store.count(SubCategory::COLLECTION, &filter).await? != found {
                    return Err(AppError::BadRequest(
                        "One or more subcategories do not belong to the product category".into(),
                    ));
                }
            }
        }
        doc.insert("subcategories", ids);
    }

    if creating {
        for counter in ["sold", "ratingsQuantity"] {
            if !doc.contains_key(counter) {
                doc.insert(counter, 0_i64);
            }
        }
    }
    Ok(doc)
}

#[async_trait]
impl Resource for Product {
    const COLLECTION: &'static str = "products";
    const LABEL: &'static str = "product";
    const SINGULAR: &'static str = "product";
    const PLURAL: &'static str = "products";
    const CACHE_BUCKET: Option<&'static str> = Some("products");
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
    const IMAGE_FIELDS: &'static [&'static str] = &["imageCover", "images"];

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
