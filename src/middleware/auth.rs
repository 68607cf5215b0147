use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    error::{AppError, INVALID_TOKEN, MISSING_TOKEN},
    state::AppState,
};

/// Identity of the caller, taken from a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_str = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized(MISSING_TOKEN))?
            .to_str()
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized(INVALID_TOKEN))?;

        let state = AppState::from_ref(state);
        let claims = state.tokens.validate(token)?;

        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}
