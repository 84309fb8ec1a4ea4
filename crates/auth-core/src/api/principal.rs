//! Authorization gate
//!
//! Extractors that resolve the bearer token into a [`Principal`] before a
//! handler runs. No credential gives the anonymous path; an invalid or
//! expired credential is rejected with 401 before any handler logic; a
//! principal whose roles miss the requirement gets 403. Handlers declare
//! their requirement by choosing an extractor.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use super::ApiState;
use crate::types::{Principal, Role};
use crate::Error;

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Anonymous-tolerant principal: `None` when no credential was presented.
/// A credential that is present but invalid still rejects with 401.
pub struct MaybePrincipal(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<ApiState> for MaybePrincipal {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(MaybePrincipal(None)),
            Some(token) => {
                let principal = state.auth.resolve_principal(&token).await?;
                Ok(MaybePrincipal(Some(principal)))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<ApiState> for Principal {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
        state.auth.resolve_principal(&token).await
    }
}

fn require_any(principal: Principal, required: &[Role]) -> Result<Principal, Error> {
    if principal.has_any_role(required) {
        Ok(principal)
    } else {
        Err(Error::Forbidden)
    }
}

/// Requires MOD or ADMIN.
pub struct RequireMod(pub Principal);

#[async_trait]
impl FromRequestParts<ApiState> for RequireMod {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        Ok(RequireMod(require_any(
            principal,
            &[Role::Mod, Role::Admin],
        )?))
    }
}

/// Requires ADMIN.
pub struct RequireAdmin(pub Principal);

#[async_trait]
impl FromRequestParts<ApiState> for RequireAdmin {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        Ok(RequireAdmin(require_any(principal, &[Role::Admin])?))
    }
}
