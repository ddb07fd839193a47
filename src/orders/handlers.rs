use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::auth::rbac::{self, ROLE_ADMIN};
use crate::entities::Paginate;
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

use super::dto::{CreateOrderRequest, Order, OrderFilter, UpdateOrderRequest};
use super::services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(find_orders))
        .route("/orders/:order_id", get(find_one_order))
        .route("/orders", post(create_order))
        .route("/orders/:order_id", patch(update_order))
}

#[instrument(skip(state))]
async fn find_orders(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Envelope<Paginate<Order>>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    let page = services::find_orders(&state, filter).await?;
    Ok(Envelope::new(page))
}

#[instrument(skip(state))]
async fn find_one_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order = services::find_one_order(&state, &caller, order_id).await?;
    Ok(Envelope::new(order))
}

#[instrument(skip(state, payload))]
async fn create_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Envelope<Order>>), ApiError> {
    let order = services::create_order(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Envelope::new(order)))
}

#[instrument(skip(state, payload))]
async fn update_order(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Envelope<Order>>, ApiError> {
    let order = services::update_order(&state, &caller, order_id, payload).await?;
    Ok(Envelope::new(order))
}
