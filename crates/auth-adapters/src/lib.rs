//! # auth-adapters
//!
//! Argon2id implementation of the `PasswordHasher` port. Hashes are stored
//! in PHC string format so parameters can change without a migration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use domains::{DomainError, DomainResult, PasswordHasher};

/// Argon2 with the crate's default (Argon2id) parameters.
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

fn hash_blocking(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_blocking(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    // Both calls run on the blocking pool.
    async fn hash_password(&self, password: &str) -> DomainResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| DomainError::Internal(format!("hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let password = password.to_string();
        let hash = hash.to_string();
        match tokio::task::spawn_blocking(move || verify_blocking(&password, &hash)).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = Argon2PasswordHasher::new();
        let hash = hasher.hash_password("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_password("correct horse", &hash).await);
        assert!(!hasher.verify_password("battery staple", &hash).await);
    }

    #[tokio::test]
    async fn same_password_gets_a_fresh_salt() {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash_password("hunter22").await.unwrap();
        let second = hasher.hash_password("hunter22").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn malformed_hash_never_verifies() {
        let hasher = Argon2PasswordHasher::new();
        assert!(!hasher.verify_password("anything", "not-a-phc-string").await);
        assert!(!hasher.verify_password("anything", "").await);
    }
}
