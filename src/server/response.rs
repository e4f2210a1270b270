//! Response rendering.
//!
//! Stored documents are BSON; clients get plain JSON with ids as hex
//! strings, dates as RFC 3339 and image file names as absolute URLs.

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mongodb::bson::{Bson, Document};
use serde_json::{Map, Value, json};

use super::features::Pagination;
use crate::resources::Resource;

/// Renders documents for a given resource.
#[derive(Debug, Clone)]
pub struct Presenter {
    base_url: Arc<str>,
}

impl Presenter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').into(),
        }
    }

    /// Render one stored document of resource `R`.
    pub fn document<R: Resource>(&self, mut doc: Document) -> Value {
        for field in R::HIDDEN_FIELDS {
            doc.remove(*field);
        }
        for field in R::IMAGE_FIELDS {
            if let Some(value) = doc.get_mut(*field) {
                self.link_images(R::COLLECTION, value);
            }
        }
        to_json(Bson::Document(doc))
    }

    pub fn documents<R: Resource>(&self, docs: Vec<Document>) -> Vec<Value> {
        docs.into_iter().map(|doc| self.document::<R>(doc)).collect()
    }

    fn link_images(&self, collection: &str, value: &mut Bson) {
        match value {
            Bson::String(file) if !file.is_empty() && !file.starts_with("http") => {
                *file = format!("{}/{}/{}", self.base_url, collection, file);
            }
            Bson::Array(items) => {
                for item in items {
                    self.link_images(collection, item);
                }
            }
            _ => {}
        }
    }
}

/// Relaxed JSON for API clients.
pub fn to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.into_relaxed_extjson(),
    }
}

/// `200 {status, results, paginationResult, data: {<plural>: [..]}}`
pub fn list<R: Resource>(pagination: &Pagination, items: Vec<Value>) -> Response {
    let mut data = Map::new();
    let results = items.len();
    data.insert(R::PLURAL.to_string(), Value::Array(items));
    Json(json!({
        "status": "success",
        "results": results,
        "paginationResult": pagination,
        "data": data,
    }))
    .into_response()
}

/// `{status, data: {<singular>: {..}}}` with the given status code.
pub fn single<R: Resource>(status: StatusCode, item: Value) -> Response {
    let mut data = Map::new();
    data.insert(R::SINGULAR.to_string(), item);
    (status, Json(json!({ "status": "success", "data": data }))).into_response()
}

/// `{status, token, data: {user}}` after signup, login or a password change.
pub fn with_token(status: StatusCode, token: &str, user: Value) -> Response {
    (
        status,
        Json(json!({ "status": "success", "token": token, "data": { "user": user } })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{DateTime, doc, oid::ObjectId};

    use super::*;
    use crate::resources::{Product, UserAccount};

    #[test]
    fn test_to_json_relaxes_types() {
        let id = ObjectId::new();
        let value = to_json(Bson::Document(doc! {
            "_id": id,
            "price": 200_i64,
            "rating": 4.5,
            "at": DateTime::from_millis(0),
        }));
        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["price"], json!(200));
        assert_eq!(value["rating"], json!(4.5));
        assert_eq!(value["at"], json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_image_links() {
        let presenter = Presenter::new("http://localhost:8000/");
        let value = presenter.document::<Product>(doc! {
            "imageCover": "cover.jpeg",
            "images": ["a.jpeg", "https://cdn.example.com/b.jpeg"],
        });
        assert_eq!(
            value["imageCover"],
            json!("http://localhost:8000/products/cover.jpeg")
        );
        assert_eq!(
            value["images"],
            json!([
                "http://localhost:8000/products/a.jpeg",
                "https://cdn.example.com/b.jpeg"
            ])
        );
    }

    #[test]
    fn test_hidden_fields_removed() {
        let presenter = Presenter::new("http://localhost:8000");
        let value = presenter.document::<UserAccount>(doc! {
            "name": "Ahmed",
            "password": "$2b$12$hash",
            "passwordResetCode": "abc",
        });
        assert_eq!(value, json!({ "name": "Ahmed" }));
    }
}
