//! Configuration for the auth core
//!
//! Loaded once at startup from the environment (prefix `AGORA`, `__` as the
//! nesting separator), layered over defaults. The JWT secret has no default;
//! [`crate::jwt::TokenCodec::new`] rejects a missing or undersized secret so
//! misconfiguration is fatal before the server binds.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
}

/// Token configuration. `secret_base64` is base64-encoded symmetric key
/// material and must decode to at least 32 bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret_base64: String,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

/// Argon2 cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub argon2_memory_cost: u32,
    pub argon2_time_cost: u32,
    pub argon2_parallelism: u32,
}

impl AuthConfig {
    /// Load configuration from the environment, e.g.
    /// `AGORA_JWT__SECRET_BASE64`, `AGORA_DATABASE_URL`.
    pub fn from_env() -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(
                config::Config::try_from(&AuthConfig::default())
                    .map_err(|e| Error::Config(e.to_string()))?,
            )
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        loaded
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://agora.db?mode=rwc".to_string(),
            bind_address: "127.0.0.1:8080".to_string(),
            jwt: JwtConfig::default(),
            password: PasswordConfig::default(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            // No usable default secret; must come from the environment.
            secret_base64: String::new(),
            access_ttl_ms: 900_000,         // 15 minutes
            refresh_ttl_ms: 2_592_000_000,  // 30 days
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}
