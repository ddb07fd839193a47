use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::products::dto::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Waiting,
    Shipping,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Waiting => "waiting",
            OrderStatus::Shipping => "shipping",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "waiting" => Some(OrderStatus::Waiting),
            "shipping" => Some(OrderStatus::Shipping),
            "completed" => Some(OrderStatus::Completed),
            "canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSlip {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One order line as read back: the quantity plus the product as it looked
/// when the order was placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsOrder {
    pub id: Uuid,
    pub qty: i32,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub contact: String,
    pub status: OrderStatus,
    pub transfer_slip: Option<TransferSlip>,
    #[serde(default)]
    pub products: Vec<ProductsOrder>,
    pub total_paid: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub qty: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Honored only when the caller is an admin; everyone else orders for
    /// themselves.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub address: String,
    pub contact: String,
    pub products: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferSlipRequest {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub transfer_slip: Option<TransferSlipRequest>,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub order_by: String,
    #[serde(default)]
    pub sort_by: String,
}

impl OrderFilter {
    /// Clamp pagination and validate the optional date window. A window needs
    /// both endpoints in `YYYY-MM-DD` form; anything else is rejected before
    /// query building.
    pub fn normalized(mut self) -> Result<Self, ApiError> {
        if self.page < 1 {
            self.page = 1;
        }
        if self.limit < 5 {
            self.limit = 5;
        }
        if self.start_date.is_empty() != self.end_date.is_empty() {
            return Err(ApiError::Validation(
                "start_date and end_date must be supplied together".into(),
            ));
        }
        let format = format_description!("[year]-[month]-[day]");
        for date in [&self.start_date, &self.end_date] {
            if !date.is_empty() && time::Date::parse(date, &format).is_err() {
                return Err(ApiError::Validation(format!(
                    "invalid date: {date}, expected YYYY-MM-DD"
                )));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> OrderFilter {
        OrderFilter {
            search: String::new(),
            status: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            page: 0,
            limit: 0,
            order_by: String::new(),
            sort_by: String::new(),
        }
    }

    #[test]
    fn filter_clamps_pagination() {
        let f = filter().normalized().unwrap();
        assert_eq!(f.page, 1);
        assert_eq!(f.limit, 5);
    }

    #[test]
    fn date_window_requires_both_endpoints() {
        let mut f = filter();
        f.start_date = "2024-01-01".into();
        assert!(matches!(
            f.normalized(),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn date_window_rejects_malformed_dates() {
        let mut f = filter();
        f.start_date = "2024-01-01".into();
        f.end_date = "01/02/2024".into();
        assert!(matches!(
            f.normalized(),
            Err(ApiError::Validation(_))
        ));

        let mut f = filter();
        f.start_date = "2024-01-01".into();
        f.end_date = "2024-02-01".into();
        assert!(f.normalized().is_ok());
    }

    #[test]
    fn status_parse_roundtrip() {
        for s in ["waiting", "shipping", "completed", "canceled"] {
            assert_eq!(OrderStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(OrderStatus::parse("delivered").is_none());
    }
}
