//! Password reset codes.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::info;

use super::AuthError;

/// How long a reset code stays valid.
pub const RESET_CODE_TTL: Duration = Duration::from_secs(10 * 60);

/// Random six digit code.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Stored form of a reset code.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Delivers reset codes to users.
#[async_trait]
pub trait ResetCodeSender: Send + Sync {
    async fn send(&self, email: &str, name: &str, code: &str) -> Result<(), AuthError>;
}

/// Writes reset codes to the log. Stands in for a mail transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResetSender;

#[async_trait]
impl ResetCodeSender for LogResetSender {
    async fn send(&self, email: &str, name: &str, code: &str) -> Result<(), AuthError> {
        info!(
            email = %email,
            "Password reset code for {}: {} (valid for {} minutes)",
            name,
            code,
            RESET_CODE_TTL.as_secs() / 60
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_code() {
        let hashed = hash_code("123456");
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hash_code(" 123456 "));
        assert_ne!(hashed, hash_code("123457"));
    }
}
