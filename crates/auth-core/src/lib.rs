//! # Agora Auth Core
//!
//! Authentication and session core for the Agora forum backend.
//!
//! This crate provides:
//! - User storage in SQLite (username/email/password-hash/roles)
//! - Password hashing with Argon2
//! - Stateless access tokens (HS256 JWT) with an opaque, rotated refresh token
//! - Role-based authorization gate as axum extractors
//! - REST API for register/login/logout/refresh
//!
//! ## Architecture
//!
//! The [`AuthenticationService`] orchestrates the leaves (credential store,
//! password hasher, token codec, refresh token store). Resource handlers for
//! posts, comments, communities and so on live elsewhere and only consume the
//! [`Principal`] extractor this crate exposes.

pub mod error;
pub mod types;
pub mod config;
pub mod password;
pub mod jwt;
pub mod store;
pub mod upload;
pub mod auth;
pub mod validation;
pub mod api;

pub use error::{Error, Result};
pub use types::{User, NewUser, RefreshToken, Role, Principal};
pub use config::{AuthConfig, JwtConfig, PasswordConfig};
pub use password::PasswordHasher;
pub use jwt::TokenCodec;
pub use store::{SqliteStore, UserStore, RefreshTokenStore};
pub use upload::BlobUpload;
pub use auth::{AuthenticationService, AuthenticationResult, TokenPair, RegisterUser};

/// Initialize the auth core service.
///
/// Connects the store, builds the codec and hasher from configuration and
/// wires them into an [`AuthenticationService`]. A missing or undersized JWT
/// secret fails here, at startup, never per request.
pub async fn init(config: AuthConfig) -> Result<AuthenticationService> {
    let store = SqliteStore::connect(&config.database_url).await?;

    let codec = TokenCodec::new(&config.jwt)?;
    let hasher = PasswordHasher::new(&config.password)?;

    let refresh_ttl_ms = i64::try_from(config.jwt.refresh_ttl_ms).map_err(|_| {
        Error::Config("refresh_ttl_ms does not fit in a signed 64-bit value".to_string())
    })?;
    let refresh_store = RefreshTokenStore::new(
        store.pool().clone(),
        chrono::Duration::milliseconds(refresh_ttl_ms),
    );

    let users = std::sync::Arc::new(store);

    Ok(AuthenticationService::new(users, refresh_store, codec, hasher))
}
