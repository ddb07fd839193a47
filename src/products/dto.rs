use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::categories::dto::Category;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Image {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
}

/// Image reference supplied by clients after uploading through the files
/// endpoint; rows get their ids on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: Option<Category>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category_id: i32,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<i32>,
    pub images: Option<Vec<ImageRef>>,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub order_by: String,
    #[serde(default)]
    pub sort_by: String,
}

impl ProductFilter {
    /// Clamp pagination to the supported minimums before any query building.
    pub fn normalized(mut self) -> Self {
        if self.page < 1 {
            self.page = 1;
        }
        if self.limit < 5 {
            self.limit = 5;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clamps_pagination() {
        let f = ProductFilter {
            search: String::new(),
            page: 0,
            limit: 2,
            order_by: String::new(),
            sort_by: String::new(),
        }
        .normalized();
        assert_eq!(f.page, 1);
        assert_eq!(f.limit, 5);

        let f = ProductFilter {
            search: String::new(),
            page: 3,
            limit: 20,
            order_by: String::new(),
            sort_by: String::new(),
        }
        .normalized();
        assert_eq!(f.page, 3);
        assert_eq!(f.limit, 20);
    }
}
