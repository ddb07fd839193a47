use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{bind_query, bind_query_scalar, SqlParam};
use crate::error::ApiError;

use super::dto::{Order, OrderFilter, OrderStatus};
use super::find_builder;
use super::insert_builder::{line_items_statement, NewOrder, NewOrderLine};

const TX_DEADLINE: Duration = Duration::from_secs(10);

fn tx_step(step: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |source| ApiError::Transaction { step, source }
}

fn one_order_sql(pin_user: bool) -> String {
    let user_clause = if pin_user {
        r#" AND "o"."user_id" = $2"#
    } else {
        ""
    };
    format!(
        r#"
        SELECT
            to_jsonb("t")
        FROM (
            SELECT
                "o"."id",
                "o"."user_id",
                "o"."address",
                "o"."contact",
                "o"."status",
                "o"."transfer_slip",
                (
                    SELECT
                        COALESCE(array_to_json(array_agg("pt")), '[]'::json)
                    FROM (
                        SELECT
                            "po"."id",
                            "po"."qty",
                            "po"."product"
                        FROM "products_orders" "po"
                        WHERE "po"."order_id" = "o"."id"
                    ) AS "pt"
                ) AS "products",
                (
                    SELECT
                        COALESCE(SUM(("po"."product"->>'price')::FLOAT * "po"."qty"), 0)
                    FROM "products_orders" "po"
                    WHERE "po"."order_id" = "o"."id"
                ) AS "total_paid",
                "o"."created_at",
                "o"."updated_at"
            FROM "orders" "o"
            WHERE "o"."id" = $1{user_clause}
        ) AS "t""#,
    )
}

/// Fetches one order. When `user_id` is given the lookup is pinned to that
/// owner, so other customers' orders read as missing rather than forbidden.
pub async fn find_one_order(
    db: &PgPool,
    order_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<Order, ApiError> {
    let sql = one_order_sql(user_id.is_some());
    let mut query = sqlx::query_scalar::<_, Option<serde_json::Value>>(&sql).bind(order_id);
    if let Some(user_id) = user_id {
        query = query.bind(user_id);
    }
    let row = query.fetch_optional(db).await?.flatten();
    let value = row.ok_or_else(|| ApiError::NotFound("order not found".into()))?;
    let order = serde_json::from_value(value).map_err(anyhow::Error::from)?;
    Ok(order)
}

pub async fn find_orders(
    db: &PgPool,
    filter: &OrderFilter,
) -> Result<(Vec<Order>, i64), ApiError> {
    let data = find_builder::data_query(filter);
    let row: Option<serde_json::Value> = bind_query_scalar(
        sqlx::query_scalar(&data.sql),
        data.params,
    )
    .fetch_one(db)
    .await?;
    let orders: Vec<Order> = match row {
        Some(value) => serde_json::from_value(value).map_err(anyhow::Error::from)?,
        None => Vec::new(),
    };

    let count = find_builder::count_query(filter);
    let total: i64 = bind_query_scalar(sqlx::query_scalar(&count.sql), count.params)
        .fetch_one(db)
        .await?;

    Ok((orders, total))
}

/// Inserts the order header and its lines in one transaction. The line
/// snapshots arrive pre-built; nothing here re-reads the catalogue.
pub async fn insert_order(
    db: &PgPool,
    order: &NewOrder,
    lines: &[NewOrderLine],
) -> Result<Uuid, ApiError> {
    let work = async {
        let mut tx = db.begin().await.map_err(tx_step("begin transaction"))?;

        let order_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO "orders" (
                "user_id",
                "address",
                "contact",
                "status"
            )
            VALUES ($1, $2, $3, $4)
            RETURNING "id"
            "#,
        )
        .bind(order.user_id)
        .bind(&order.address)
        .bind(&order.contact)
        .bind(order.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(tx_step("insert order"))?;

        if let Some(items) = line_items_statement(order_id, lines) {
            bind_query(sqlx::query(&items.sql), items.params)
                .execute(&mut *tx)
                .await
                .map_err(tx_step("insert order lines"))?;
        }

        tx.commit().await.map_err(tx_step("commit"))?;
        Ok(order_id)
    };
    tokio::time::timeout(TX_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Partial order update built inline: only supplied columns contribute SET
/// fragments, and an optional owner pin joins the WHERE clause.
pub async fn update_order(
    db: &PgPool,
    order_id: Uuid,
    status: Option<OrderStatus>,
    transfer_slip: Option<serde_json::Value>,
    user_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<SqlParam> = Vec::new();

    if let Some(status) = status {
        params.push(SqlParam::Text(status.as_str().to_string()));
        sets.push(format!(r#""status" = ${}"#, params.len()));
    }
    if let Some(slip) = transfer_slip {
        params.push(SqlParam::Json(slip));
        sets.push(format!(r#""transfer_slip" = ${}"#, params.len()));
    }
    if sets.is_empty() {
        return Ok(());
    }

    params.push(SqlParam::Uuid(order_id));
    let mut sql = format!(
        r#"UPDATE "orders" SET {} WHERE "id" = ${}"#,
        sets.join(", "),
        params.len(),
    );
    if let Some(user_id) = user_id {
        params.push(SqlParam::Uuid(user_id));
        sql.push_str(&format!(r#" AND "user_id" = ${}"#, params.len()));
    }

    let result = bind_query(sqlx::query(&sql), params).execute(db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("order not found".into()));
    }
    Ok(())
}
