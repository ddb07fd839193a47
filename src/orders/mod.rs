pub mod dto;
pub mod find_builder;
pub mod handlers;
pub mod insert_builder;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::router()
}
