//! Authentication and permission guards.
//!
//! `authorize` runs as route middleware: it resolves the bearer token (or
//! the `JWT` cookie) to an active user, optionally checks a permission,
//! and leaves a [`Principal`] in the request extensions for handlers.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use mongodb::bson::{doc, from_document, oid::ObjectId};
use tracing::debug;

use super::AppState;
use crate::database::{StoreError, USERS, User};
use crate::error::{AppError, INVALID_TOKEN, PASSWORD_CHANGED, USER_GONE};
use crate::permissions::Permission;

pub const TOKEN_COOKIE: &str = "JWT";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: ObjectId,
    pub role: String,
    pub email: String,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(AppError::not_logged_in)
    }
}

/// Middleware state: the app plus the permission a route group needs.
#[derive(Clone)]
pub struct Guard {
    state: AppState,
    permission: Option<Permission>,
}

impl Guard {
    /// Any logged-in user.
    pub fn user(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            permission: None,
        }
    }

    /// Logged-in users whose role grants `permission`.
    pub fn require(state: &AppState, permission: Permission) -> Self {
        Self {
            state: state.clone(),
            permission: Some(permission),
        }
    }
}

pub async fn authorize(
    State(guard): State<Guard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authenticate(&guard.state, req.headers()).await?;

    if let Some(permission) = guard.permission {
        check(&guard.state, &principal, permission)?;
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Reject callers whose role does not grant `permission`.
pub fn check(
    state: &AppState,
    principal: &Principal,
    permission: Permission,
) -> Result<(), AppError> {
    if state.permissions.allows(&principal.role, permission) {
        Ok(())
    } else {
        debug!(
            "Denied {} to {} ({})",
            permission, principal.email, principal.role
        );
        Err(AppError::forbidden())
    }
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, AppError> {
    let token = token_from(headers).ok_or_else(AppError::not_logged_in)?;
    let claims = state.tokens.verify(&token)?;

    let id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;
    let doc = state
        .store
        .find_one(USERS, &doc! { "_id": id, "active": true }, None)
        .await?
        .ok_or_else(|| AppError::Unauthorized(USER_GONE.to_string()))?;
    let user: User = from_document(doc).map_err(StoreError::from)?;

    if user.changed_password_after(claims.iat) {
        return Err(AppError::Unauthorized(PASSWORD_CHANGED.to_string()));
    }

    Ok(Principal {
        id: user.id,
        role: user.role,
        email: user.email,
    })
}

/// Bearer token first, then the auth cookie.
fn token_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty() && *value != "loggedout")
        .map(|(_, value)| value.to_string())
}

/// Attach the auth cookie to a response.
pub fn set_token_cookie(state: &AppState, response: &mut Response, token: &str) {
    let max_age = state.tokens.ttl().as_secs();
    let secure = if state.secure_cookies { "; Secure" } else { "" };
    let cookie = format!("{TOKEN_COOKIE}={token}; Path=/; Max-Age={max_age}; HttpOnly{secure}");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

/// Overwrite the auth cookie with a short-lived placeholder.
pub fn clear_token_cookie(response: &mut Response) {
    let cookie = format!("{TOKEN_COOKIE}=loggedout; Path=/; Max-Age=10; HttpOnly");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}
