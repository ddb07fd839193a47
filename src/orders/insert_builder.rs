use uuid::Uuid;

use crate::entities::{BuiltQuery, SqlParam};

use super::dto::OrderStatus;

/// Order header values as they go into the insert. The lines carry the
/// product snapshot as JSON so later catalogue edits never change what the
/// customer agreed to pay.
#[derive(Debug)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub address: String,
    pub contact: String,
    pub status: OrderStatus,
}

#[derive(Debug)]
pub struct NewOrderLine {
    pub qty: i32,
    pub product: serde_json::Value,
}

/// Bulk insert for order lines, one group of three placeholders per line.
pub fn line_items_statement(order_id: Uuid, lines: &[NewOrderLine]) -> Option<BuiltQuery> {
    if lines.is_empty() {
        return None;
    }
    let mut params: Vec<SqlParam> = Vec::with_capacity(lines.len() * 3);
    let mut groups: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        params.push(SqlParam::Int(line.qty as i64));
        params.push(SqlParam::Json(line.product.clone()));
        params.push(SqlParam::Uuid(order_id));
        let n = params.len();
        groups.push(format!("(${}, ${}, ${})", n - 2, n - 1, n));
    }
    let sql = format!(
        r#"
        INSERT INTO "products_orders" (
            "qty",
            "product",
            "order_id"
        )
        VALUES {}"#,
        groups.join(", "),
    );
    Some(BuiltQuery { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_are_three_wide_and_contiguous() {
        let order_id = Uuid::new_v4();
        let lines = vec![
            NewOrderLine {
                qty: 2,
                product: json!({"title": "Teapot", "price": 12.5}),
            },
            NewOrderLine {
                qty: 1,
                product: json!({"title": "Mug", "price": 4.0}),
            },
            NewOrderLine {
                qty: 4,
                product: json!({"title": "Spoon", "price": 1.5}),
            },
        ];
        let q = line_items_statement(order_id, &lines).unwrap();
        assert!(q.sql.contains("($1, $2, $3), ($4, $5, $6), ($7, $8, $9)"));
        assert_eq!(q.params.len(), 9);
        assert_eq!(q.params[0], SqlParam::Int(2));
        assert_eq!(q.params[3], SqlParam::Int(1));
        assert_eq!(q.params[8], SqlParam::Uuid(order_id));
    }

    #[test]
    fn no_lines_no_statement() {
        assert!(line_items_statement(Uuid::new_v4(), &[]).is_none());
    }
}
