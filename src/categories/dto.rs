use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Category {
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    #[serde(default)]
    pub title: String,
}
