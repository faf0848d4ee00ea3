//! Request extractors for authenticated callers.

use axum::{async_trait, extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};
use uuid::Uuid;

use super::Role;
use crate::error::Error;
use crate::state::AppState;

/// Any caller with a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser { pub id: Uuid, pub role: Role }

/// A caller whose role is `admin` or `superadmin`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

fn bearer(parts: &Parts) -> Result<&str, Error> {
    let header = parts.headers.get(AUTHORIZATION).ok_or_else(|| Error::Unauthorized("missing bearer token".into()))?;
    let value = header.to_str().map_err(|_| Error::Unauthorized("malformed authorization header".into()))?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("missing bearer token".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.tokens.verify(bearer(parts)?)?;
        Ok(AuthUser { id: claims.sub, role: claims.role })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            tracing::debug!(user_id = %user.id, role = %user.role, "admin route refused");
            return Err(Error::Forbidden("admin role required".into()));
        }
        Ok(AdminUser(user))
    }
}
