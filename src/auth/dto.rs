use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub oauth_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UserToken {
    pub id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Signed-in identity plus its live token pair.
#[derive(Debug, Serialize)]
pub struct Passport {
    pub user: User,
    pub token: UserToken,
}

#[derive(Debug, Serialize)]
pub struct AdminTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub key: String,
}
