//! User account model.
//!
//! Catalog entities are handled as raw documents by the generic handlers;
//! users get a typed view because authentication reads their fields.

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

pub const USERS: &str = "users";

/// Stored user account.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    /// bcrypt hash.
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime>,

    // --- Password reset state ---

    /// SHA-256 hex of the emailed code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_verified: Option<bool>,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_active() -> bool {
    true
}

impl User {
    /// Whether the password changed after a token issued at `iat` (unix seconds).
    pub fn changed_password_after(&self, iat: i64) -> bool {
        self.password_changed_at
            .is_some_and(|changed| changed.timestamp_millis() / 1000 > iat)
    }

    /// Whether a reset code has been verified and is still within its window.
    pub fn reset_verified(&self, now: DateTime) -> bool {
        self.password_reset_verified == Some(true)
            && self.password_reset_expires.is_some_and(|exp| exp > now)
    }
}
