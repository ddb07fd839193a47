use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{ApiError, Envelope};
use crate::state::AppState;

use super::dto::{
    AdminTokenResponse, ApiKeyResponse, LoginRequest, LogoutRequest, Passport, RefreshRequest,
    RegisterRequest,
};
use super::extractors::{AdminTokenGuard, AuthUser};
use super::jwt::JwtKeys;
use super::rbac::{self, ROLE_ADMIN};
use super::repo::{self, User};
use super::services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(signup))
        .route("/users/signup-admin", post(signup_admin))
        .route("/users/signin", post(signin))
        .route("/users/refresh", post(refresh))
        .route("/users/signout", post(signout))
        .route("/users/admin/token", get(admin_token))
        .route("/users/admin/apikey", get(api_key))
        .route("/users/:user_id", get(get_profile))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<User>>), ApiError> {
    let user = services::register(&state, payload, false).await?;
    Ok((StatusCode::CREATED, Envelope::new(user)))
}

#[instrument(skip(state, payload))]
async fn signup_admin(
    State(state): State<AppState>,
    _guard: AdminTokenGuard,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<User>>), ApiError> {
    let user = services::register(&state, payload, true).await?;
    Ok((StatusCode::CREATED, Envelope::new(user)))
}

#[instrument(skip(state, payload))]
async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Envelope<Passport>>, ApiError> {
    let passport = services::login(&state, payload).await?;
    Ok(Envelope::new(passport))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<Envelope<Passport>>, ApiError> {
    let passport = services::refresh(&state, payload).await?;
    Ok(Envelope::new(passport))
}

#[instrument(skip(state, payload))]
async fn signout(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    services::logout(&state, payload.oauth_id).await?;
    Ok(Envelope::new("signed out"))
}

/// Issues the short-lived admin token used to create further admin accounts.
#[instrument(skip(state))]
async fn admin_token(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Envelope<AdminTokenResponse>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let token = JwtKeys::from_ref(&state).sign_admin()?;
    Ok(Envelope::new(AdminTokenResponse { token }))
}

/// Issues the long-lived api key that gates the public read endpoints.
#[instrument(skip(state))]
async fn api_key(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Envelope<ApiKeyResponse>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let key = JwtKeys::from_ref(&state).sign_api_key()?;
    Ok(Envelope::new(ApiKeyResponse { key }))
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Envelope<User>>, ApiError> {
    if caller.id != user_id {
        rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    }
    let user = repo::get_profile(&state.db, user_id).await?;
    Ok(Envelope::new(user))
}
