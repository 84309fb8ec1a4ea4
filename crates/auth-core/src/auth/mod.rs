//! Authentication service
//!
//! Orchestrates the credential store, password hasher, token codec and
//! refresh token store. A session moves
//! `Anonymous -> Authenticated -> (Refreshed)* -> Revoked`.

use std::sync::Arc;

use crate::jwt::TokenCodec;
use crate::password::PasswordHasher;
use crate::store::{RefreshTokenStore, UserStore};
use crate::types::{NewUser, Principal, Role, User};
use crate::upload::BlobUpload;
use crate::{Error, Result};

/// Registration input. Plaintext password; hashing happens in here.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Fresh credential pair returned by `refresh`, so the caller can replace
/// both of its stored tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthenticationService {
    users: Arc<dyn UserStore>,
    refresh_tokens: RefreshTokenStore,
    codec: TokenCodec,
    hasher: PasswordHasher,
    uploader: Option<Arc<dyn BlobUpload>>,
}

impl AuthenticationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: RefreshTokenStore,
        codec: TokenCodec,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            codec,
            hasher,
            uploader: None,
        }
    }

    /// Wire in the avatar upload collaborator.
    pub fn with_uploader(mut self, uploader: Arc<dyn BlobUpload>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Register a regular user (default role USER).
    pub async fn register(&self, request: RegisterUser, avatar: Option<&[u8]>) -> Result<User> {
        self.register_with_roles(request, avatar, &[]).await
    }

    /// Register a moderator (USER + MOD). Callers gate this behind the
    /// MOD/ADMIN requirement at the API layer.
    pub async fn register_mod(&self, request: RegisterUser, avatar: Option<&[u8]>) -> Result<User> {
        self.register_with_roles(request, avatar, &[Role::Mod]).await
    }

    /// Register an administrator (USER + MOD + ADMIN).
    pub async fn register_admin(
        &self,
        request: RegisterUser,
        avatar: Option<&[u8]>,
    ) -> Result<User> {
        self.register_with_roles(request, avatar, &[Role::Mod, Role::Admin])
            .await
    }

    async fn register_with_roles(
        &self,
        request: RegisterUser,
        avatar: Option<&[u8]>,
        extra_roles: &[Role],
    ) -> Result<User> {
        // Fast-path duplicate check for a friendly error; the UNIQUE
        // constraints in the store remain the authoritative guard.
        if self.users.username_exists(&request.username).await? {
            return Err(Error::AlreadyExists("Username already exists.".to_string()));
        }
        if self.users.email_exists(&request.email).await? {
            return Err(Error::AlreadyExists("Email is already in use.".to_string()));
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let image_url = match (avatar, &self.uploader) {
            (Some(bytes), Some(uploader)) => Some(uploader.upload(bytes).await?),
            (Some(_), None) => {
                tracing::warn!("avatar supplied but no blob uploader is configured");
                None
            }
            _ => None,
        };

        let mut roles = vec![Role::User];
        for role in extra_roles {
            if !roles.contains(role) {
                roles.push(*role);
            }
        }

        self.users
            .create_user(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                image_url,
                roles,
            })
            .await
    }

    /// Verify credentials and open a session.
    ///
    /// `identifier` matches username or email. Unknown identifier and wrong
    /// password produce the identical [`Error::InvalidCredentials`]; the
    /// unknown path still burns one hash verification so the two are not
    /// trivially distinguishable by timing either.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthenticationResult> {
        let user = match self.users.find_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy(password);
                return Err(Error::InvalidCredentials);
            }
        };

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(Error::InvalidCredentials);
        }

        // Single-active-token policy: a new login supersedes any session.
        self.refresh_tokens.revoke_all_for_user(&user.id).await?;
        let refresh_token = self.refresh_tokens.issue(&user.id).await?;
        let access_token = self.codec.issue_access(&user.username)?;

        tracing::info!(username = %user.username, "login succeeded");

        Ok(AuthenticationResult {
            user,
            access_token,
            refresh_token: refresh_token.token,
        })
    }

    /// Exchange a refresh token for a fresh access/refresh pair, rotating
    /// the presented token out of existence.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let rotated = self.refresh_tokens.rotate(refresh_token).await?;

        let user = self
            .users
            .find_by_id(&rotated.user_id)
            .await?
            .ok_or(Error::RefreshTokenNotFound)?;

        let access_token = self.codec.issue_access(&user.username)?;

        Ok(TokenPair {
            access_token,
            refresh_token: rotated.token,
        })
    }

    /// Revoke every refresh token of the current principal. With no
    /// principal this is a graceful no-op, never an error, so a double
    /// logout stays 200.
    pub async fn logout(&self, principal: Option<&Principal>) -> Result<String> {
        match principal {
            Some(principal) => {
                let revoked = self
                    .refresh_tokens
                    .revoke_all_for_user(&principal.user_id)
                    .await?;
                tracing::info!(username = %principal.username, revoked, "logged out");
                Ok("You've been logged out".to_string())
            }
            None => Ok("No active session to log out".to_string()),
        }
    }

    /// Resolve a bearer access token into a [`Principal`].
    ///
    /// Roles come from the store, not the token: the token only carries a
    /// subject, and the role set may have changed since issuance.
    pub async fn resolve_principal(&self, token: &str) -> Result<Principal> {
        let username = self.codec.verify(token)?;
        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or(Error::Unauthorized)?;
        Ok(Principal::from(&user))
    }

    /// Direct access to the token codec, mainly for tests and for services
    /// that need to mint tokens out of band.
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }
}
