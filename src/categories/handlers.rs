use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::extractors::{ApiKeyGuard, AuthUser};
use crate::auth::rbac::{self, ROLE_ADMIN};
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

use super::dto::{Category, CategoryFilter, CategoryRequest};
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(find_categories))
        .route("/categories", post(insert_category))
        .route("/categories/:category_id", delete(delete_category))
}

#[instrument(skip(state))]
async fn find_categories(
    State(state): State<AppState>,
    _guard: ApiKeyGuard,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Envelope<Vec<Category>>>, ApiError> {
    let categories = repo::find_categories(&state.db, filter.title.trim()).await?;
    Ok(Envelope::new(categories))
}

#[instrument(skip(state, payload))]
async fn insert_category(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Envelope<Category>>), ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    let category = repo::insert_category(&state.db, title).await?;
    Ok((StatusCode::CREATED, Envelope::new(category)))
}

#[instrument(skip(state))]
async fn delete_category(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(category_id): Path<i32>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    repo::delete_category(&state.db, category_id).await?;
    Ok(Envelope::new("deleted"))
}
