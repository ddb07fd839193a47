use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::{ApiKeyGuard, AuthUser};
use crate::auth::rbac::{self, ROLE_ADMIN};
use crate::entities::Paginate;
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

use super::dto::{CreateProductRequest, Product, ProductFilter, UpdateProductRequest};
use super::services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(find_products))
        .route("/products/:product_id", get(find_one_product))
        .route("/products", post(create_product))
        .route("/products/:product_id", patch(update_product))
        .route("/products/:product_id", delete(delete_product))
}

#[instrument(skip(state))]
async fn find_products(
    State(state): State<AppState>,
    _guard: ApiKeyGuard,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Envelope<Paginate<Product>>>, ApiError> {
    let page = services::find_products(&state, filter).await?;
    Ok(Envelope::new(page))
}

#[instrument(skip(state))]
async fn find_one_product(
    State(state): State<AppState>,
    _guard: ApiKeyGuard,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<Product>>, ApiError> {
    let product = services::find_one_product(&state, product_id).await?;
    Ok(Envelope::new(product))
}

#[instrument(skip(state, payload))]
async fn create_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Envelope<Product>>), ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let product = services::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Envelope::new(product)))
}

#[instrument(skip(state, payload))]
async fn update_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Envelope<Product>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let product = services::update_product(&state, product_id, payload).await?;
    Ok(Envelope::new(product))
}

#[instrument(skip(state))]
async fn delete_product(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    services::delete_product(&state, product_id).await?;
    Ok(Envelope::new("deleted"))
}
