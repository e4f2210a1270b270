//! Catalog routes beyond plain CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use mongodb::bson::{Document, doc};
use serde_json::{Value, json};

use super::crud;
use crate::database::{FindOptions, Query};
use crate::error::AppError;
use crate::resources::{Category, Product, Resource, SubCategory};
use crate::server::AppState;
use crate::server::extract::{JsonBody, ListParams};
use crate::utils::parse_object_id;

/// `GET /categories/:categoryId/subcategories`
pub async fn list_subcategories(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    ListParams(params): ListParams,
) -> Result<Response, AppError> {
    let category = parse_object_id(&category_id, Category::LABEL)?;
    crud::list::<SubCategory>(&state, doc! { "category": category }, &params).await
}

/// `POST /categories/:categoryId/subcategories`; the path wins only when the
/// body names no category.
pub async fn create_subcategory(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    JsonBody(mut body): JsonBody,
) -> Result<Response, AppError> {
    body.entry("category")
        .or_insert_with(|| Value::String(category_id));
    crud::create::<SubCategory>(&state, body).await
}

/// `POST /products/search {text}`
pub async fn search_products(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search text is required".into()))?;

    let pattern = regex::escape(text);
    let clauses: Vec<Document> = Product::SEARCH_FIELDS
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            clause
        })
        .collect();
    let mut filter = Product::scope();
    filter.insert("$or", clauses);

    let docs = state
        .queries
        .execute_in(
            &Query::find(Product::COLLECTION, filter, FindOptions::default()),
            Product::CACHE_BUCKET,
        )
        .await?
        .into_many();
    let products = state.presenter.documents::<Product>(docs);

    Ok(Json(json!({
        "status": "success",
        "results": products.len(),
        "data": { (Product::PLURAL): products },
    }))
    .into_response())
}
