//! REST API for the auth core
//!
//! JSON bodies carry both tokens (bearer-header transport for the access
//! token on protected routes). Field names are camelCase on the wire.

pub mod principal;
pub mod security_headers;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::auth::{AuthenticationService, RegisterUser};
use crate::types::Role;
use crate::{Error, Result};
use principal::{MaybePrincipal, RequireAdmin, RequireMod};

/// Shared state for the auth routes.
#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthenticationService>,
}

/// Build the `/auth` router.
pub fn create_router(auth: Arc<AuthenticationService>) -> Router {
    create_router_with_state(ApiState { auth })
}

pub fn create_router_with_state(state: ApiState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/register-mod", post(register_mod))
        .route("/auth/register-admin", post(register_admin))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refreshtoken", post(refresh_token))
        .layer(middleware::from_fn(
            security_headers::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---- Wire types -----------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 40))]
    pub username: String,
    #[validate(length(min = 3, max = 80), email)]
    pub email: String,
    #[validate(length(min = 3, max = 80))]
    pub password: String,
}

impl RegisterRequest {
    /// Derive-based field checks plus the username character whitelist.
    fn check(&self) -> Result<()> {
        self.validate()?;
        crate::validation::validate_username_format(&self.username)
            .map_err(|_| Error::Validation("username contains invalid characters".to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub id: String,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<RegisterRequest> for RegisterUser {
    fn from(request: RegisterRequest) -> Self {
        RegisterUser {
            username: request.username,
            email: request.email,
            password: request.password,
        }
    }
}

// ---- Handlers -------------------------------------------------------------

async fn register(
    State(state): State<ApiState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    request.check()?;
    state.auth.register(request.into(), None).await?;
    Ok(Json(MessageResponse {
        message: "Successfully registered!".to_string(),
    }))
}

async fn register_mod(
    State(state): State<ApiState>,
    RequireMod(_principal): RequireMod,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    request.check()?;
    state.auth.register_mod(request.into(), None).await?;
    Ok(Json(MessageResponse {
        message: "Successfully registered!".to_string(),
    }))
}

async fn register_admin(
    State(state): State<ApiState>,
    RequireAdmin(_principal): RequireAdmin,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    request.check()?;
    state.auth.register_admin(request.into(), None).await?;
    Ok(Json(MessageResponse {
        message: "Successfully registered!".to_string(),
    }))
}

async fn login(
    State(state): State<ApiState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if request.identifier.is_empty() || request.password.is_empty() {
        // Shape-identical to a credential mismatch; reveals nothing.
        return Err(Error::InvalidCredentials);
    }
    let outcome = state
        .auth
        .login(&request.identifier, &request.password)
        .await?;
    Ok(Json(LoginResponse {
        access_token: outcome.access_token,
        refresh_token: outcome.refresh_token,
        id: outcome.user.id,
        username: outcome.user.username,
        email: outcome.user.email,
        roles: outcome.user.roles,
        image_url: outcome.user.image_url,
    }))
}

async fn logout(
    State(state): State<ApiState>,
    MaybePrincipal(principal): MaybePrincipal,
) -> Result<Json<MessageResponse>> {
    let message = state.auth.logout(principal.as_ref()).await?;
    Ok(Json(MessageResponse { message }))
}

async fn refresh_token(
    State(state): State<ApiState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenRefreshResponse>> {
    let pair = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(TokenRefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}
