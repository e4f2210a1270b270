//! `/auth`: signup, login, logout and the password reset flow.

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mongodb::bson::{Bson, DateTime, Document, doc};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{crud, decode_user, password_set, str_field};
use crate::auth::{RESET_CODE_TTL, generate_code, hash_code};
use crate::database::{USERS, User};
use crate::error::AppError;
use crate::resources::{UserAccount, new_account};
use crate::server::AppState;
use crate::server::extract::JsonBody;
use crate::server::guard::{clear_token_cookie, set_token_cookie};
use crate::server::response::with_token;
use crate::utils::Validator;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

/// Render a user with a fresh token and set the auth cookie.
pub(super) fn token_response(
    state: &AppState,
    status: StatusCode,
    user: &User,
    doc: Document,
) -> Result<Response, AppError> {
    let token = state.tokens.issue(&user.id)?;
    let mut response = with_token(
        status,
        &token,
        state.presenter.document::<UserAccount>(doc),
    );
    set_token_cookie(state, &mut response, &token);
    Ok(response)
}

/// `POST /auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let doc = new_account(&body, &state, false).await?;
    let created = crud::insert::<UserAccount>(&state, doc).await?;
    let user = decode_user(created.clone())?;
    info!("New account: {}", user.email);
    token_response(&state, StatusCode::CREATED, &user, created)
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let mut v = Validator::new(&body);
    v.field("email")
        .required("email required")
        .email("Invalid email address");
    v.field("password").required("password required");
    v.finish()?;

    let email = str_field(&body, "email").to_lowercase();
    let password = str_field(&body, "password");

    let filter = doc! { "email": email.as_str(), "active": true };
    let Some(doc) = state.store.find_one(USERS, &filter, None).await? else {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    };
    let user = decode_user(doc.clone())?;
    if !state.passwords.verify(password, &user.password).await? {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    token_response(&state, StatusCode::OK, &user, doc)
}

/// `GET /auth/logout`
pub async fn logout() -> Response {
    let mut response = Json(json!({ "status": "success" })).into_response();
    clear_token_cookie(&mut response);
    response
}

/// `POST /auth/forgotpassword {email}`
pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let email = str_field(&body, "email").trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("email required".into()));
    }

    let filter = doc! { "email": email.as_str(), "active": true };
    let doc = state
        .store
        .find_one(USERS, &filter, None)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("There is no user with email {email}")))?;
    let user = decode_user(doc)?;

    let code = generate_code();
    let expires = DateTime::from_millis(
        DateTime::now().timestamp_millis() + millis(RESET_CODE_TTL),
    );
    crud::update::<UserAccount>(
        &state,
        user.id,
        doc! {
            "passwordResetCode": hash_code(&code),
            "passwordResetExpires": expires,
            "passwordResetVerified": false,
        },
    )
    .await?;

    if let Err(e) = state.reset_codes.send(&user.email, &user.name, &code).await {
        warn!("Clearing reset code for {} after failed delivery", user.email);
        crud::update::<UserAccount>(&state, user.id, cleared_reset_fields()).await?;
        return Err(e.into());
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Reset code sent to email",
    }))
    .into_response())
}

/// `POST /auth/verifyResetCode {resetCode}`
pub async fn verify_reset_code(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let code = match body.get("resetCode") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(AppError::BadRequest("Reset code required".into())),
    };

    let filter = doc! {
        "passwordResetCode": hash_code(&code),
        "passwordResetExpires": { "$gt": DateTime::now() },
        "active": true,
    };
    let doc = state
        .store
        .find_one(USERS, &filter, None)
        .await?
        .ok_or_else(|| AppError::BadRequest("Reset code invalid or expired".into()))?;
    let user = decode_user(doc)?;

    crud::update::<UserAccount>(&state, user.id, doc! { "passwordResetVerified": true }).await?;
    Ok(Json(json!({ "status": "success" })).into_response())
}

/// `PATCH /auth/resetPassword {email, newPassword}`
pub async fn reset_password(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Response, AppError> {
    let mut v = Validator::new(&body);
    v.field("email")
        .required("email required")
        .email("Invalid email address");
    v.field("newPassword")
        .required("newPassword required")
        .string("newPassword must be a string")
        .min_len(6, "Password must be at least 6 characters");
    v.finish()?;

    let email = str_field(&body, "email").to_lowercase();
    let filter = doc! { "email": email.as_str(), "active": true };
    let doc = state
        .store
        .find_one(USERS, &filter, None)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("There is no user with email {email}")))?;
    let user = decode_user(doc)?;

    if !user.reset_verified(DateTime::now()) {
        return Err(AppError::BadRequest("Reset code not verified".into()));
    }

    let mut set = password_set(&state, str_field(&body, "newPassword")).await?;
    set.extend(cleared_reset_fields());
    let updated = crud::update::<UserAccount>(&state, user.id, set).await?;
    info!("Password reset for {}", user.email);
    token_response(&state, StatusCode::OK, &user, updated)
}

fn cleared_reset_fields() -> Document {
    doc! {
        "passwordResetCode": Bson::Null,
        "passwordResetExpires": Bson::Null,
        "passwordResetVerified": Bson::Null,
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
