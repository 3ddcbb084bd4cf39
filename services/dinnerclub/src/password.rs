//! One-way password hashing
//!
//! Argon2id with a fixed, configured cost and a fresh random salt per hash.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};
use serde::Deserialize;
use thiserror::Error;

/// Argon2 cost parameters, fixed for the lifetime of the process
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Password hashing errors
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Invalid password hashing parameters: {0}")]
    Params(String),

    #[error("Failed to hash password: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    Verification(String),

    #[error("Password hashing task failed: {0}")]
    Task(String),
}

/// Password hashing service
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    /// Create a password service with fixed cost parameters
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::Params(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unparsable stored hash is an error.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(stored_hash)
            .map_err(|e| PasswordError::Verification(e.to_string()))?;

        match self.argon2().verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::Verification(e.to_string())),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_blocking(&self, plaintext: &str) -> Result<String, PasswordError> {
        let service = self.clone();
        let plaintext = plaintext.to_string();

        tokio::task::spawn_blocking(move || service.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool
    pub async fn verify_blocking(
        &self,
        plaintext: &str,
        stored_hash: &str,
    ) -> Result<bool, PasswordError> {
        let service = self.clone();
        let plaintext = plaintext.to_string();
        let stored_hash = stored_hash.to_string();

        tokio::task::spawn_blocking(move || service.verify(&plaintext, &stored_hash))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_service() -> PasswordService {
        PasswordService::new(&PasswordConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let service = fast_service();
        let hash = service.hash("correcthorsebattery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("correcthorsebattery", &hash).unwrap());
        assert!(!service.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let service = fast_service();
        let first = service.hash("correcthorsebattery").unwrap();
        let second = service.hash("correcthorsebattery").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let service = fast_service();
        let err = service.verify("anything", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, PasswordError::Verification(_)));
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let service = fast_service();
        let hash = service.hash_blocking("correcthorsebattery").await.unwrap();

        assert!(service.verify_blocking("correcthorsebattery", &hash).await.unwrap());
        assert!(!service.verify_blocking("wrong-password", &hash).await.unwrap());
        assert!(matches!(
            service.verify_blocking("anything", "not-a-phc-string").await,
            Err(PasswordError::Verification(_))
        ));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordService::new(&PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(PasswordError::Params(_))));
    }
}
