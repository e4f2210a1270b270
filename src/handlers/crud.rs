//! Generic CRUD handlers, instantiated once per [`Resource`].
//!
//! Reads go through the query cache under the resource's bucket; every
//! successful write clears that bucket before responding.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mongodb::bson::{Bson, DateTime, Document, oid::ObjectId};
use serde_json::{Map, Value};
use tracing::debug;

use crate::database::{FindOptions, Query};
use crate::error::AppError;
use crate::resources::Resource;
use crate::server::extract::{JsonBody, ListParams};
use crate::server::features::{ListQuery, Pagination};
use crate::server::response::{self, to_json};
use crate::server::AppState;
use crate::utils::parse_object_id;

pub async fn get_all<R: Resource>(
    State(state): State<AppState>,
    ListParams(params): ListParams,
) -> Result<Response, AppError> {
    list::<R>(&state, Document::new(), &params).await
}

pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id, R::LABEL)?;
    let doc = state
        .queries
        .execute_in(&Query::find_one(R::COLLECTION, by_id::<R>(id)), R::CACHE_BUCKET)
        .await?
        .into_one()
        .ok_or_else(|| AppError::no_document(&id.to_hex()))?;

    let mut item = state.presenter.document::<R>(doc);

    if let Some(relation) = R::RELATION {
        let mut filter = Document::new();
        filter.insert(relation.foreign_field, id);
        let related = state
            .queries
            .execute_in(
                &Query::find(relation.collection, filter, FindOptions::default()),
                relation.bucket,
            )
            .await?
            .into_many();
        if let Value::Object(map) = &mut item {
            map.insert(
                relation.field.to_string(),
                Value::Array(related.into_iter().map(|d| to_json(Bson::Document(d))).collect()),
            );
        }
    }

    Ok(response::single::<R>(StatusCode::OK, item))
}

pub async fn create_one<R: Resource>(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    create::<R>(&state, body).await
}

pub async fn update_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id, R::LABEL)?;
    let set = R::prepare_update(id, body, &state).await?;
    let updated = update::<R>(&state, id, set).await?;
    Ok(response::single::<R>(
        StatusCode::OK,
        state.presenter.document::<R>(updated),
    ))
}

pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id, R::LABEL)?;
    state
        .store
        .delete_one(R::COLLECTION, &by_id::<R>(id))
        .await?
        .ok_or_else(|| AppError::no_document(&id.to_hex()))?;
    invalidate::<R>(&state).await;
    debug!("Deleted {} {}", R::LABEL, id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// List documents matching the query string plus a fixed `preset` filter.
pub async fn list<R: Resource>(
    state: &AppState,
    preset: Document,
    params: &[(String, String)],
) -> Result<Response, AppError> {
    let ListQuery {
        mut filter,
        options,
        page,
        limit,
    } = ListQuery::parse(params, R::SEARCH_FIELDS)?;
    filter.extend(R::scope());
    filter.extend(preset);

    let total = state
        .queries
        .execute_in(&Query::count(R::COLLECTION, filter.clone()), R::CACHE_BUCKET)
        .await?
        .count();
    let docs = state
        .queries
        .execute_in(&Query::find(R::COLLECTION, filter, options), R::CACHE_BUCKET)
        .await?
        .into_many();

    let pagination = Pagination::new(page, limit, total);
    Ok(response::list::<R>(
        &pagination,
        state.presenter.documents::<R>(docs),
    ))
}

/// Validate, insert and render a new document.
pub async fn create<R: Resource>(
    state: &AppState,
    body: Map<String, Value>,
) -> Result<Response, AppError> {
    let doc = R::prepare_create(body, state).await?;
    let created = insert::<R>(state, doc).await?;
    Ok(response::single::<R>(
        StatusCode::CREATED,
        state.presenter.document::<R>(created),
    ))
}

/// Stamp and insert a prepared document.
pub async fn insert<R: Resource>(state: &AppState, mut doc: Document) -> Result<Document, AppError> {
    if !doc.contains_key("_id") {
        doc.insert("_id", ObjectId::new());
    }
    let now = DateTime::now();
    doc.insert("createdAt", now);
    doc.insert("updatedAt", now);
    let created = state.store.insert(R::COLLECTION, doc).await?;
    invalidate::<R>(state).await;
    Ok(created)
}

/// Apply `$set` to one in-scope document.
pub async fn update<R: Resource>(
    state: &AppState,
    id: ObjectId,
    mut set: Document,
) -> Result<Document, AppError> {
    set.insert("updatedAt", DateTime::now());
    let updated = state
        .store
        .update_one(R::COLLECTION, &by_id::<R>(id), set)
        .await?
        .ok_or_else(|| AppError::no_document(&id.to_hex()))?;
    invalidate::<R>(state).await;
    Ok(updated)
}

fn by_id<R: Resource>(id: ObjectId) -> Document {
    let mut filter = R::scope();
    filter.insert("_id", id);
    filter
}

async fn invalidate<R: Resource>(state: &AppState) {
    if let Some(bucket) = R::CACHE_BUCKET {
        state.invalidator.clear_bucket(bucket).await;
    }
}
