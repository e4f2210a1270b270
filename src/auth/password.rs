//! Password hashing with bcrypt.

use super::AuthError;

pub const DEFAULT_COST: u32 = 12;

/// Hashes and verifies passwords off the async runtime.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let plain = plain.to_string();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??;
        Ok(hashed)
    }

    pub async fn verify(&self, plain: &str, hashed: &str) -> Result<bool, AuthError> {
        let plain = plain.to_string();
        let hashed = hashed.to_string();
        let ok = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hashed)).await??;
        Ok(ok)
    }
}
