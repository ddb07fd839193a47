use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

use super::jwt::{JwtKeys, TokenError, UserClaims};
use super::repo;

/// Authenticated caller. Requires a valid access token whose (user, token)
/// pair still exists in the session store; a signed token alone is not
/// sufficient.
pub struct AuthUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("invalid authorization header".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token)?;
        let user = claims.claims.ok_or(TokenError::Malformed)?;

        if !repo::has_access_token(&state.db, user.id, token).await? {
            warn!(user_id = %user.id, "access token not found in session store");
            return Err(ApiError::Unauthorized("session is no longer active".into()));
        }

        Ok(AuthUser(user))
    }
}

/// Guard for public read endpoints: a valid long-lived api key must be
/// presented in `X-Api-Key`.
#[derive(Debug)]
pub struct ApiKeyGuard;

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing api key".into()))?;
        JwtKeys::from_ref(state).verify_api_key(token)?;
        Ok(ApiKeyGuard)
    }
}

/// Guard for bootstrap admin registration: a short-lived admin token must be
/// presented in `X-Admin-Token`.
#[derive(Debug)]
pub struct AdminTokenGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminTokenGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get("x-admin-token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing admin token".into()))?;
        JwtKeys::from_ref(state).verify_admin(token)?;
        Ok(AdminTokenGuard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Instrumented handlers record the guard arguments, so both must stay
    // Debug-formattable.
    #[test]
    fn guards_are_debug_formattable() {
        assert_eq!(format!("{:?}", ApiKeyGuard), "ApiKeyGuard");
        assert_eq!(format!("{:?}", AdminTokenGuard), "AdminTokenGuard");
    }
}
