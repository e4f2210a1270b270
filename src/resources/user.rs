//! User accounts as managed by administrators and by users themselves.

use async_trait::async_trait;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde_json::{Map, Value};

use super::{Resource, copy_fields};
use crate::database::USERS;
use crate::error::AppError;
use crate::server::AppState;
use crate::utils::{Validator, slugify};

pub struct UserAccount;

const PROFILE_FIELDS: &[&str] = &["name", "email", "phone", "profileImg"];

/// Loose phone check: optional `+`, then 7 to 15 digits once spaces and
/// dashes are dropped.
fn is_phone(raw: &str) -> bool {
    let compact: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn validate_profile(v: &mut Validator<'_>, creating: bool) {
    let name = v.field("name");
    let name = if creating { name.required("name required") } else { name };
    name.string("name must be a string")
        .min_len(3, "Too short User name")
        .max_len(64, "Too long User name");

    let email = v.field("email");
    let email = if creating { email.required("email required") } else { email };
    email.string("Invalid email address").email("Invalid email address");

    v.field("phone").string("Invalid phone number");
    v.field("profileImg").string("profileImg must be a string");
}

/// Reject an email already used by another account, active or not.
async fn ensure_email_free(
    state: &AppState,
    email: &str,
    except: Option<ObjectId>,
) -> Result<(), AppError> {
    let mut filter = doc! { "email": email };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    if state.store.find_one(USERS, &filter, None).await?.is_some() {
        return Err(AppError::BadRequest("E-mail already in use".into()));
    }
    Ok(())
}

/// Copy profile fields, normalising email and deriving the slug.
async fn profile_document(
    body: &Map<String, Value>,
    state: &AppState,
    except: Option<ObjectId>,
) -> Result<Document, AppError> {
    if let Some(phone) = body.get("phone").and_then(Value::as_str)
        && !is_phone(phone)
    {
        return Err(AppError::BadRequest("Invalid phone number".into()));
    }

    let mut doc = Document::new();
    copy_fields(body, PROFILE_FIELDS, &mut doc);
    if let Ok(email) = doc.get_str("email") {
        let email = email.to_lowercase();
        ensure_email_free(state, &email, except).await?;
        doc.insert("email", email);
    }
    if let Ok(name) = doc.get_str("name") {
        let slug = slugify(name);
        doc.insert("slug", slug);
    }
    Ok(doc)
}

/// Build a new account from a signup or admin create body.
///
/// `role` is only honoured when `allow_role` is set.
pub async fn new_account(
    body: &Map<String, Value>,
    state: &AppState,
    allow_role: bool,
) -> Result<Document, AppError> {
    let mut v = Validator::new(body);
    validate_profile(&mut v, true);
    v.field("password")
        .required("password required")
        .string("password must be a string")
        .min_len(6, "Password must be at least 6 characters");
    let confirm_present = v
        .field("passwordConfirm")
        .required("Password confirmation required")
        .valid();
    if allow_role {
        let roles = state.permissions.roles();
        v.field("role").one_of(&roles, "Invalid role");
    }
    if confirm_present && body.get("password") != body.get("passwordConfirm") {
        v.reject("Password confirmation incorrect");
    }
    v.finish()?;

    let mut doc = profile_document(body, state, None).await?;
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();
    doc.insert("password", state.passwords.hash(password).await?);

    let role = match body.get("role").and_then(Value::as_str) {
        Some(role) if allow_role => role,
        _ => "user",
    };
    doc.insert("role", role);
    doc.insert("active", true);
    Ok(doc)
}

/// Validate a `PATCH /users/updateMe` body.
pub async fn user_self_update(
    id: ObjectId,
    body: Map<String, Value>,
    state: &AppState,
) -> Result<Document, AppError> {
    if body.contains_key("password") || body.contains_key("passwordConfirm") {
        return Err(AppError::BadRequest(
            "This route is not for password updates. Please use /changeMyPassword.".into(),
        ));
    }
    let mut v = Validator::new(&body);
    validate_profile(&mut v, false);
    v.finish()?;
    profile_document(&body, state, Some(id)).await
}

#[async_trait]
impl Resource for UserAccount {
    const COLLECTION: &'static str = USERS;
    const LABEL: &'static str = "user";
    const SINGULAR: &'static str = "user";
    const PLURAL: &'static str = "users";
    const CACHE_BUCKET: Option<&'static str> = None;
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email"];
    const UNIQUE_FIELDS: &'static [&'static str] = &["email"];
    const IMAGE_FIELDS: &'static [&'static str] = &["profileImg"];
    const HIDDEN_FIELDS: &'static [&'static str] = &[
        "password",
        "passwordResetCode",
        "passwordResetExpires",
        "passwordResetVerified",
    ];

    fn scope() -> Document {
        doc! { "active": true }
    }

    async fn prepare_create(
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError> {
        new_account(&body, state, true).await
    }

    /// Role changes go through `updateRole`; passwords through `changePassword`.
    async fn prepare_update(
        id: ObjectId,
        body: Map<String, Value>,
        state: &AppState,
    ) -> Result<Document, AppError> {
        if body.contains_key("password") {
            return Err(AppError::BadRequest(
                "this route is not for updating password".into(),
            ));
        }
        let mut v = Validator::new(&body);
        validate_profile(&mut v, false);
        v.finish()?;
        profile_document(&body, state, Some(id)).await
    }
}
