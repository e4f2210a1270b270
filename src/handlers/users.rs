//! `/users`: the caller's own account, plus admin-only password and role
//! changes.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mongodb::bson::doc;
use serde_json::{Value, json};
use tracing::info;

use super::auth::token_response;
use super::{crud, decode_user, password_set, str_field};
use crate::database::USERS;
use crate::error::AppError;
use crate::resources::{Resource, UserAccount, user_self_update};
use crate::server::AppState;
use crate::server::extract::JsonBody;
use crate::server::guard::Principal;
use crate::utils::{Validator, parse_object_id};

/// `GET /users/getMe`
pub async fn get_me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Response, AppError> {
    crud::get_one::<UserAccount>(State(state), Path(principal.id.to_hex())).await
}

/// `PATCH /users/updateMe`
pub async fn update_me(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let set = user_self_update(principal.id, body, &state).await?;
    let updated = crud::update::<UserAccount>(&state, principal.id, set).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "User data updated successfully",
        "data": { "user": state.presenter.document::<UserAccount>(updated) },
    }))
    .into_response())
}

/// `PATCH /users/changeMyPassword {currentPassword, newPassword, passwordConfirm}`
pub async fn change_my_password(
    State(state): State<AppState>,
    principal: Principal,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let mut v = Validator::new(&body);
    v.field("currentPassword")
        .required("Please provide your current password");
    v.field("newPassword")
        .required("Please provide your new password")
        .string("newPassword must be a string")
        .min_len(6, "Password must be at least 6 characters");
    v.field("passwordConfirm")
        .required("Please confirm your password");
    v.finish()?;

    let doc = state
        .store
        .find_one(USERS, &doc! { "_id": principal.id, "active": true }, None)
        .await?
        .ok_or_else(|| AppError::BadRequest("Error, Please login again".into()))?;
    let user = decode_user(doc)?;

    if !state
        .passwords
        .verify(str_field(&body, "currentPassword"), &user.password)
        .await?
    {
        return Err(AppError::BadRequest("Incorrect current password".into()));
    }
    if body.get("newPassword") != body.get("passwordConfirm") {
        return Err(AppError::BadRequest("Passwords don't match".into()));
    }

    let set = password_set(&state, str_field(&body, "newPassword")).await?;
    let updated = crud::update::<UserAccount>(&state, user.id, set).await?;
    info!("{} changed their password", user.email);
    token_response(&state, StatusCode::OK, &user, updated)
}

/// `DELETE /users/deleteMe`
pub async fn delete_me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Response, AppError> {
    crud::update::<UserAccount>(&state, principal.id, doc! { "active": false }).await?;
    info!("Deactivated {}", principal.email);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `PATCH /users/changePassword/:id {password}`
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id, UserAccount::LABEL)?;
    let mut v = Validator::new(&body);
    v.field("password")
        .required("password required")
        .string("password must be a string")
        .min_len(6, "Password must be at least 6 characters");
    v.finish()?;

    let set = password_set(&state, str_field(&body, "password")).await?;
    let updated = crud::update::<UserAccount>(&state, id, set).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Password updated successfully",
        "data": { "user": state.presenter.document::<UserAccount>(updated) },
    }))
    .into_response())
}

/// `PATCH /users/updateRole/:id {role}`
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id, UserAccount::LABEL)?;
    let role = body
        .get("role")
        .and_then(Value::as_str)
        .filter(|role| state.permissions.is_known_role(role))
        .ok_or_else(|| AppError::BadRequest("Invalid role specified".into()))?;

    let updated = crud::update::<UserAccount>(&state, id, doc! { "role": role }).await?;
    info!("Role of {} set to {}", id, role);
    Ok(Json(json!({
        "status": "success",
        "data": { "user": state.presenter.document::<UserAccount>(updated) },
    }))
    .into_response())
}
