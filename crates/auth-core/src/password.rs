//! Password hashing
//!
//! Argon2id with a per-hash random salt. `verify` never errors toward the
//! caller: a malformed stored hash verifies as `false`.

use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use password_hash::{PasswordHash, SaltString};

use crate::config::PasswordConfig;
use crate::{Error, Result};

pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password, verified against on the unknown-user
    /// path so login cost does not reveal whether the identifier exists.
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(config: &PasswordConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| Error::Config(format!("Invalid Argon2 parameters: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"agora-dummy-credential", &salt)
            .map_err(|e| Error::Internal(format!("Hashing failed: {}", e)))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }

    /// Burn one verification against a fixed hash.
    pub fn verify_dummy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        // Low costs so the tests stay fast.
        PasswordHasher::new(&PasswordConfig {
            argon2_memory_cost: 4096,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret123").unwrap();
        assert!(hasher.verify("secret123", &hash));
        assert!(!hasher.verify("secret124", &hash));
    }

    #[test]
    fn same_plaintext_hashes_differently() {
        let hasher = hasher();
        let a = hasher.hash("secret123").unwrap();
        let b = hasher.hash("secret123").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("secret123", &a));
        assert!(hasher.verify("secret123", &b));
    }

    #[test]
    fn malformed_hash_verifies_false() {
        let hasher = hasher();
        assert!(!hasher.verify("secret123", "not-a-phc-string"));
        assert!(!hasher.verify("secret123", ""));
    }
}
