//! Database models.

pub mod user;

pub use user::{USERS, User};
