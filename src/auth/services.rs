use axum::extract::FromRef;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{LoginRequest, Passport, RefreshRequest, RegisterRequest, UserToken};
use super::jwt::{JwtKeys, UserClaims};
use super::password::{hash_password, is_valid_email, verify_password};
use super::rbac::{ROLE_ADMIN, ROLE_CUSTOMER};
use super::repo;
use super::repo::User;

fn validate_register(req: &RegisterRequest) -> Result<(), ApiError> {
    if !is_valid_email(req.email.trim()) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password too short".into()));
    }
    if req.username.trim().is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    Ok(())
}

pub async fn register(
    state: &AppState,
    req: RegisterRequest,
    is_admin: bool,
) -> Result<User, ApiError> {
    validate_register(&req)?;
    let email = req.email.trim().to_lowercase();
    let hash = hash_password(&req.password)?;
    let role_id = if is_admin { ROLE_ADMIN } else { ROLE_CUSTOMER };
    let user = repo::insert_user(&state.db, &email, &hash, req.username.trim(), role_id).await?;
    info!(user_id = %user.id, role_id, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<Passport, ApiError> {
    let email = req.email.trim().to_lowercase();
    let cred = repo::find_user_by_email(&state.db, &email).await?;
    if !verify_password(&req.password, &cred.password)? {
        return Err(ApiError::Validation("invalid password".into()));
    }

    let claims = UserClaims {
        id: cred.id,
        role_id: cred.role_id,
    };
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(&claims)?;
    let refresh_token = keys.sign_refresh(&claims)?;

    let oauth_id = repo::insert_oauth(&state.db, cred.id, &access_token, &refresh_token).await?;
    info!(user_id = %cred.id, "user logged in");

    Ok(Passport {
        user: User {
            id: cred.id,
            email: cred.email,
            username: cred.username,
            role_id: cred.role_id,
        },
        token: UserToken {
            id: oauth_id,
            access_token,
            refresh_token,
        },
    })
}

/// Rotate a session. The new refresh token keeps the expiry of the one
/// presented, so rotation never extends the session past its original end.
pub async fn refresh(state: &AppState, req: RefreshRequest) -> Result<Passport, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let old_claims = keys.verify_refresh(&req.refresh_token)?;

    let oauth = repo::find_oauth_by_refresh(&state.db, &req.refresh_token).await?;
    let user = repo::get_profile(&state.db, oauth.user_id).await?;

    let claims = UserClaims {
        id: user.id,
        role_id: user.role_id,
    };
    let access_token = keys.sign_access(&claims)?;
    let refresh_token = keys.repeat_refresh(&claims, old_claims.exp)?;

    repo::update_oauth(&state.db, oauth.id, &access_token, &refresh_token).await?;
    info!(user_id = %user.id, oauth_id = %oauth.id, "session rotated");

    Ok(Passport {
        user,
        token: UserToken {
            id: oauth.id,
            access_token,
            refresh_token,
        },
    })
}

pub async fn logout(state: &AppState, oauth_id: uuid::Uuid) -> Result<(), ApiError> {
    repo::delete_oauth(&state.db, oauth_id).await?;
    info!(%oauth_id, "session deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(email: &str, password: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            username: username.into(),
        }
    }

    #[test]
    fn register_validation() {
        assert!(validate_register(&req("shopper@example.com", "longenough", "shopper")).is_ok());
        assert!(matches!(
            validate_register(&req("nope", "longenough", "shopper")),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_register(&req("shopper@example.com", "short", "shopper")),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_register(&req("shopper@example.com", "longenough", "  ")),
            Err(ApiError::Validation(_))
        ));
    }
}
