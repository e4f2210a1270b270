//! HTTP handlers.
//!
//! - `crud` - Generic list/get/create/update/delete per resource
//! - `catalog` - Nested subcategories and product search
//! - `auth` - Signup, login and password reset
//! - `users` - Logged-in user and admin account routes

pub mod auth;
pub mod catalog;
pub mod crud;
pub mod users;

use mongodb::bson::{DateTime, Document, doc, from_document};
use serde_json::{Map, Value};

use crate::database::{StoreError, User};
use crate::error::AppError;
use crate::server::AppState;

pub(crate) fn decode_user(doc: Document) -> Result<User, AppError> {
    Ok(from_document(doc).map_err(StoreError::from)?)
}

/// A string body field already checked by a validator.
pub(crate) fn str_field<'a>(body: &'a Map<String, Value>, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// `$set` for a new password. `passwordChangedAt` is back-dated by a second
/// so a token issued right after the change stays valid.
pub(crate) async fn password_set(state: &AppState, plain: &str) -> Result<Document, AppError> {
    let hash = state.passwords.hash(plain).await?;
    let changed_at = DateTime::from_millis(DateTime::now().timestamp_millis() - 1000);
    Ok(doc! { "password": hash, "passwordChangedAt": changed_at })
}
