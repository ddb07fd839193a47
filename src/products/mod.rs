pub mod dto;
pub mod find_builder;
pub mod handlers;
pub mod repo;
pub mod services;
pub mod update_builder;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::router()
}
