//! Password hashing.

use crate::AuthError;

/// Lowest cost accepted in production configuration.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// One-way password hashing.
#[async_trait::async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plain: &str) -> Result<String, AuthError>;

    /// `Ok(false)` on mismatch; `Err` only when the digest is unusable.
    async fn verify(&self, plain: &str, digest: &str) -> Result<bool, AuthError>;
}

/// bcrypt hasher. Work runs on the blocking pool so request tasks keep moving.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

#[async_trait::async_trait]
impl PasswordHasher for BcryptHasher {
    async fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let plain = plain.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| AuthError::internal(format!("hash task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("bcrypt hash: {e}")))
    }

    async fn verify(&self, plain: &str, digest: &str) -> Result<bool, AuthError> {
        let plain = plain.to_owned();
        let digest = digest.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &digest))
            .await
            .map_err(|e| AuthError::internal(format!("verify task failed: {e}")))?
            .map_err(|e| AuthError::internal(format!("bcrypt verify: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = BcryptHasher::new(4);
        let digest = hasher.hash("s3cret!").await.unwrap();

        assert_ne!(digest, "s3cret!");
        assert!(hasher.verify("s3cret!", &digest).await.unwrap());
        assert!(!hasher.verify("wrong", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn digest_records_cost() {
        let digest = BcryptHasher::new(5).hash("pw").await.unwrap();
        assert!(digest.starts_with("$2b$05$"), "{digest}");
    }

    #[tokio::test]
    async fn garbage_digest_is_an_error() {
        let hasher = BcryptHasher::new(4);
        assert!(hasher.verify("pw", "not-a-bcrypt-digest").await.is_err());
    }
}
