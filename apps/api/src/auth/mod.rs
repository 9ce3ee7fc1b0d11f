//! Authentication: password hashing, JWT issuing, and the request extractors
//! that turn a bearer token into an `AuthUser`.

pub mod handlers;
pub mod password;
pub mod token;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// The caller identified by a valid bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_seeker(&self) -> Result<(), AppError> {
        match self.role {
            Role::JobSeeker => Ok(()),
            Role::Business => Err(AppError::Forbidden),
        }
    }

    pub fn require_business(&self) -> Result<(), AppError> {
        match self.role {
            Role::Business => Ok(()),
            Role::JobSeeker => Err(AppError::Forbidden),
        }
    }

    pub fn is_seeker(&self) -> bool {
        self.role == Role::JobSeeker
    }
}

/// Anonymous callers are allowed; a present-but-invalid token is still rejected.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

/// Extracts the token from `Authorization: Bearer <token>`.
/// `Ok(None)` when the header is absent.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized(
            "Authorization header must use the Bearer scheme".to_string(),
        )),
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let claims = token::verify_token(token, &state.config.jwt_secret)?;
    Ok(Some(AuthUser {
        id: claims.sub,
        role: claims.role,
    }))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(MaybeAuthUser)
    }
}
