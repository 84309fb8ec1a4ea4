//! Authentication service flow tests: register, login, refresh rotation,
//! logout and principal resolution.

use std::sync::Arc;
use std::time::Duration;

use agora_auth_core::{
    init, AuthConfig, AuthenticationService, BlobUpload, Error, JwtConfig, PasswordConfig,
    RegisterUser, Role,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tempfile::TempDir;

fn test_config(db_url: String) -> AuthConfig {
    AuthConfig {
        database_url: db_url,
        bind_address: "127.0.0.1:0".to_string(),
        jwt: JwtConfig {
            secret_base64: BASE64.encode([0x2a; 32]),
            access_ttl_ms: 60_000,
            refresh_ttl_ms: 120_000,
        },
        // Low argon2 costs so the tests stay fast.
        password: PasswordConfig {
            argon2_memory_cost: 4096,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        },
    }
}

async fn setup() -> (AuthenticationService, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let service = init(test_config(db_url)).await.unwrap();
    (service, temp_dir)
}

fn alice() -> RegisterUser {
    RegisterUser {
        username: "alice".to_string(),
        email: "alice@x.com".to_string(),
        password: "secret123".to_string(),
    }
}

#[tokio::test]
async fn register_then_login() {
    let (service, _temp_dir) = setup().await;

    let user = service.register(alice(), None).await.unwrap();
    assert_eq!(user.roles, vec![Role::User]);

    let outcome = service.login("alice", "secret123").await.unwrap();
    assert!(!outcome.access_token.is_empty());
    assert!(!outcome.refresh_token.is_empty());
    assert_eq!(outcome.user.username, "alice");

    // Email works as the identifier too.
    let by_email = service.login("alice@x.com", "secret123").await.unwrap();
    assert_eq!(by_email.user.id, outcome.user.id);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();

    let same_username = RegisterUser {
        email: "other@x.com".to_string(),
        ..alice()
    };
    assert!(matches!(
        service.register(same_username, None).await,
        Err(Error::AlreadyExists(_))
    ));

    let same_email = RegisterUser {
        username: "alice2".to_string(),
        ..alice()
    };
    assert!(matches!(
        service.register(same_email, None).await,
        Err(Error::AlreadyExists(_))
    ));
}

#[tokio::test]
async fn login_failures_are_uniform() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();

    let wrong_password = service.login("alice", "wrong").await.unwrap_err();
    let unknown_user = service.login("nobody", "whatever").await.unwrap_err();

    assert!(matches!(wrong_password, Error::InvalidCredentials));
    assert!(matches!(unknown_user, Error::InvalidCredentials));
    // Indistinguishable message.
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
}

#[tokio::test]
async fn refresh_rotates_the_token() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();
    let outcome = service.login("alice", "secret123").await.unwrap();

    let pair = service.refresh(&outcome.refresh_token).await.unwrap();
    assert_ne!(pair.refresh_token, outcome.refresh_token);
    assert!(!pair.access_token.is_empty());

    // The consumed token is dead.
    assert!(matches!(
        service.refresh(&outcome.refresh_token).await,
        Err(Error::RefreshTokenNotFound)
    ));

    // The replacement works exactly once more.
    let next = service.refresh(&pair.refresh_token).await.unwrap();
    assert!(matches!(
        service.refresh(&pair.refresh_token).await,
        Err(Error::RefreshTokenNotFound)
    ));
    assert!(!next.refresh_token.is_empty());
}

#[tokio::test]
async fn new_login_supersedes_previous_session() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();
    let first = service.login("alice", "secret123").await.unwrap();
    let second = service.login("alice", "secret123").await.unwrap();

    assert!(matches!(
        service.refresh(&first.refresh_token).await,
        Err(Error::RefreshTokenNotFound)
    ));
    assert!(service.refresh(&second.refresh_token).await.is_ok());
}

#[tokio::test]
async fn expired_refresh_token_is_purged() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let mut config = test_config(db_url);
    config.jwt.refresh_ttl_ms = 1;
    let service = init(config).await.unwrap();

    service.register(alice(), None).await.unwrap();
    let outcome = service.login("alice", "secret123").await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        service.refresh(&outcome.refresh_token).await,
        Err(Error::RefreshTokenExpired)
    ));
    // The stale row was deleted as a side effect.
    assert!(matches!(
        service.refresh(&outcome.refresh_token).await,
        Err(Error::RefreshTokenNotFound)
    ));
}

#[tokio::test]
async fn logout_is_idempotent() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();
    let outcome = service.login("alice", "secret123").await.unwrap();
    let principal = service
        .resolve_principal(&outcome.access_token)
        .await
        .unwrap();

    let first = service.logout(Some(&principal)).await.unwrap();
    assert_eq!(first, "You've been logged out");

    // Second logout revokes nothing but still succeeds.
    let second = service.logout(Some(&principal)).await.unwrap();
    assert_eq!(second, "You've been logged out");

    // Anonymous logout is a graceful no-op.
    let anonymous = service.logout(None).await.unwrap();
    assert_eq!(anonymous, "No active session to log out");

    // The refresh token is gone after logout.
    assert!(matches!(
        service.refresh(&outcome.refresh_token).await,
        Err(Error::RefreshTokenNotFound)
    ));
}

#[tokio::test]
async fn principal_resolution() {
    let (service, _temp_dir) = setup().await;

    service.register(alice(), None).await.unwrap();
    let outcome = service.login("alice", "secret123").await.unwrap();

    let principal = service
        .resolve_principal(&outcome.access_token)
        .await
        .unwrap();
    assert_eq!(principal.username, "alice");
    assert_eq!(principal.roles, vec![Role::User]);

    // Expired access token.
    let expired = service
        .codec()
        .issue("alice", chrono::Duration::seconds(-5))
        .unwrap();
    assert!(matches!(
        service.resolve_principal(&expired).await,
        Err(Error::TokenExpired)
    ));

    // Valid signature but unknown subject.
    let ghost = service
        .codec()
        .issue("ghost", chrono::Duration::minutes(5))
        .unwrap();
    assert!(matches!(
        service.resolve_principal(&ghost).await,
        Err(Error::Unauthorized)
    ));

    // Garbage.
    assert!(matches!(
        service.resolve_principal("garbage").await,
        Err(Error::TokenInvalid)
    ));
}

struct FixedUrlUpload;

#[async_trait]
impl BlobUpload for FixedUrlUpload {
    async fn upload(&self, _bytes: &[u8]) -> agora_auth_core::Result<String> {
        Ok("https://blobs.example/avatars/alice.png".to_string())
    }
}

struct FailingUpload;

#[async_trait]
impl BlobUpload for FailingUpload {
    async fn upload(&self, _bytes: &[u8]) -> agora_auth_core::Result<String> {
        Err(Error::Upload("blob host unreachable".to_string()))
    }
}

#[tokio::test]
async fn registration_stores_the_uploaded_avatar_url() {
    let (service, _temp_dir) = setup().await;
    let service = service.with_uploader(Arc::new(FixedUrlUpload));

    let user = service.register(alice(), Some(b"png-bytes".as_slice())).await.unwrap();
    assert_eq!(
        user.image_url.as_deref(),
        Some("https://blobs.example/avatars/alice.png")
    );

    // The URL survives the round trip through the store.
    let outcome = service.login("alice", "secret123").await.unwrap();
    assert_eq!(
        outcome.user.image_url.as_deref(),
        Some("https://blobs.example/avatars/alice.png")
    );
}

#[tokio::test]
async fn failed_avatar_upload_aborts_registration() {
    let (service, _temp_dir) = setup().await;
    let service = service.with_uploader(Arc::new(FailingUpload));

    assert!(matches!(
        service.register(alice(), Some(b"png-bytes".as_slice())).await,
        Err(Error::Upload(_))
    ));

    // No partial account was left behind; the same registration succeeds
    // once the avatar is dropped.
    let user = service.register(alice(), None).await.unwrap();
    assert!(user.image_url.is_none());
}

#[tokio::test]
async fn avatar_is_skipped_without_an_uploader() {
    let (service, _temp_dir) = setup().await;

    let user = service.register(alice(), Some(b"png-bytes".as_slice())).await.unwrap();
    assert!(user.image_url.is_none());
}

#[tokio::test]
async fn oversized_refresh_ttl_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let mut config = test_config(db_url);
    config.jwt.refresh_ttl_ms = u64::MAX;

    assert!(matches!(init(config).await, Err(Error::Config(_))));
}

#[tokio::test]
async fn elevated_registration_assigns_roles() {
    let (service, _temp_dir) = setup().await;

    let moderator = service
        .register_mod(
            RegisterUser {
                username: "mallory".to_string(),
                email: "mallory@x.com".to_string(),
                password: "secret123".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(moderator.roles, vec![Role::User, Role::Mod]);

    let admin = service
        .register_admin(
            RegisterUser {
                username: "root".to_string(),
                email: "root@x.com".to_string(),
                password: "secret123".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(admin.roles, vec![Role::User, Role::Mod, Role::Admin]);
}
