//! HTTP-facing error type.
//!
//! Every failure leaves the server as `{"status": "fail"|"error", "message": ..}`:
//! `fail` for client errors, `error` for server errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::database::StoreError;

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to get access.";
pub const FORBIDDEN: &str = "you do not have permission to perform this action";
pub const INVALID_TOKEN: &str = "Invalid token. Please log in again.";
pub const USER_GONE: &str = "The user belonging to this token no longer exists.";
pub const PASSWORD_CHANGED: &str = "User recently changed password! Please log in again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AppError {
    pub fn not_logged_in() -> Self {
        Self::Unauthorized(NOT_LOGGED_IN.to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden(FORBIDDEN.to_string())
    }

    /// Malformed identifier for a resource, e.g. `Invalid product ID format`.
    pub fn invalid_id(label: &str) -> Self {
        Self::BadRequest(format!("Invalid {label} ID format"))
    }

    /// Well-formed identifier with no matching document.
    pub fn no_document(id: &str) -> Self {
        Self::NotFound(format!("No Document with this ID {id}"))
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Store(StoreError::Duplicate { value }) => (
                StatusCode::BAD_REQUEST,
                format!("Duplicate field value: {value}. Please use another value!"),
            ),
            Self::Store(e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
            Self::Auth(AuthError::Token(_)) => (StatusCode::UNAUTHORIZED, INVALID_TOKEN.to_string()),
            Self::Auth(AuthError::Delivery(reason)) => {
                error!("Reset code delivery failed: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "There was an error sending the reset code. Try again later.".to_string(),
                )
            }
            Self::Auth(e) => {
                error!("Auth error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let label = if status.is_client_error() { "fail" } else { "error" };
        (status, Json(json!({ "status": label, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_bad_request() {
        let err = AppError::Store(StoreError::Duplicate {
            value: "Nike".to_string(),
        });
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Duplicate field value: Nike. Please use another value!");
    }

    #[test]
    fn test_backend_errors_hide_details() {
        let err = AppError::Store(StoreError::Decode("bad bson".to_string()));
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Something went wrong");
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            AppError::invalid_id("product").to_string(),
            "Invalid product ID format"
        );
        assert_eq!(
            AppError::no_document("646f3b0c4d5e8a3d4c8b4567").to_string(),
            "No Document with this ID 646f3b0c4d5e8a3d4c8b4567"
        );
    }
}
