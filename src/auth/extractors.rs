use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use crate::auth::jwt::TokenFailure;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Pull the token out of a `Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> AppResult<&str> {
    let value = authorization.ok_or(AppError::MissingCredential)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AppError::MissingCredential)?;
    if token.is_empty() {
        return Err(AppError::MissingCredential);
    }
    Ok(token)
}

/// Resolve the calling user from an `Authorization` header value.
///
/// A valid token whose subject no longer exists is reported exactly like a
/// forged or expired one.
pub async fn resolve(state: &AppState, authorization: Option<&str>) -> AppResult<User> {
    let token = bearer_token(authorization)?;
    let user_id = state.keys.validate(token).map_err(AppError::InvalidToken)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::InvalidToken(TokenFailure::UnknownSubject))?;
    debug!(user_id = %user.id, "request authenticated");
    Ok(user)
}

/// The authenticated caller of a protected route.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(v) => Some(v.to_str().map_err(|_| AppError::MissingCredential)?),
            None => None,
        };
        resolve(state, header).await.map(AuthUser)
    }
}
