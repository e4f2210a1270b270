//! Authentication primitives: tokens, password hashing and reset codes.

mod password;
mod reset;
mod token;

use thiserror::Error;

pub use password::{DEFAULT_COST, PasswordHasher};
pub use reset::{LogResetSender, RESET_CODE_TTL, ResetCodeSender, generate_code, hash_code};
pub use token::{Claims, TokenIssuer};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hash: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("blocking task: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("reset code delivery: {0}")]
    Delivery(String),
}
