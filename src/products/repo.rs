use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{bind_query, bind_query_scalar};
use crate::error::ApiError;

use super::dto::{CreateProductRequest, Image, Product, ProductFilter, UpdateProductRequest};
use super::{find_builder, update_builder};

/// Write transactions that overrun this deadline are abandoned; dropping the
/// transaction handle rolls the work back.
const TX_DEADLINE: Duration = Duration::from_secs(10);

fn tx_step(step: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |source| ApiError::Transaction { step, source }
}

const ONE_PRODUCT_SQL: &str = r#"
    SELECT
        to_jsonb("t")
    FROM (
        SELECT
            "p"."id",
            "p"."title",
            "p"."description",
            "p"."price",
            (
                SELECT
                    to_jsonb("ct")
                FROM (
                    SELECT
                        "c"."id",
                        "c"."title"
                    FROM "categories" "c"
                        LEFT JOIN "products_categories" "pc" ON "pc"."category_id" = "c"."id"
                    WHERE "pc"."product_id" = "p"."id"
                ) AS "ct"
            ) AS "category",
            "p"."created_at",
            "p"."updated_at",
            (
                SELECT
                    COALESCE(array_to_json(array_agg("it")), '[]'::json)
                FROM (
                    SELECT
                        "i"."id",
                        "i"."filename",
                        "i"."url"
                    FROM "images" "i"
                    WHERE "i"."product_id" = "p"."id"
                ) AS "it"
            ) AS "images"
        FROM "products" "p"
        WHERE "p"."id" = $1
    ) AS "t""#;

pub async fn find_one_product(db: &PgPool, product_id: Uuid) -> Result<Product, ApiError> {
    let row: Option<serde_json::Value> = sqlx::query_scalar(ONE_PRODUCT_SQL)
        .bind(product_id)
        .fetch_optional(db)
        .await?;
    let value = row.ok_or_else(|| ApiError::NotFound("product not found".into()))?;
    let product = serde_json::from_value(value).map_err(anyhow::Error::from)?;
    Ok(product)
}

/// Runs the listing pair built from the filter. The aggregate comes back as
/// one nullable JSON column; no rows matching yields NULL, which decodes to
/// an empty page. A count failure propagates instead of reporting zero.
pub async fn find_products(
    db: &PgPool,
    filter: &ProductFilter,
) -> Result<(Vec<Product>, i64), ApiError> {
    let data = find_builder::data_query(filter);
    let row: Option<serde_json::Value> = bind_query_scalar(
        sqlx::query_scalar(&data.sql),
        data.params,
    )
    .fetch_one(db)
    .await?;
    let products: Vec<Product> = match row {
        Some(value) => serde_json::from_value(value).map_err(anyhow::Error::from)?,
        None => Vec::new(),
    };

    let count = find_builder::count_query(filter);
    let total: i64 = bind_query_scalar(sqlx::query_scalar(&count.sql), count.params)
        .fetch_one(db)
        .await?;

    Ok((products, total))
}

pub async fn insert_product(db: &PgPool, req: &CreateProductRequest) -> Result<Uuid, ApiError> {
    let work = async {
        let mut tx = db.begin().await.map_err(tx_step("begin transaction"))?;

        let product_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO "products" (
                "title",
                "description",
                "price"
            )
            VALUES ($1, $2, $3)
            RETURNING "id"
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.price)
        .fetch_one(&mut *tx)
        .await
        .map_err(tx_step("insert product"))?;

        sqlx::query(
            r#"
            INSERT INTO "products_categories" ("product_id", "category_id")
            VALUES ($1, $2)
            "#,
        )
        .bind(product_id)
        .bind(req.category_id)
        .execute(&mut *tx)
        .await
        .map_err(tx_step("link category"))?;

        if let Some(images) = update_builder::images_insert_statement(product_id, &req.images) {
            bind_query(sqlx::query(&images.sql), images.params)
                .execute(&mut *tx)
                .await
                .map_err(tx_step("insert images"))?;
        }

        tx.commit().await.map_err(tx_step("commit"))?;
        Ok(product_id)
    };
    tokio::time::timeout(TX_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Applies a partial update. Returns the image rows that were replaced so
/// the caller can clear them from storage after the commit.
pub async fn update_product(
    db: &PgPool,
    product_id: Uuid,
    req: &UpdateProductRequest,
) -> Result<Vec<Image>, ApiError> {
    let header = update_builder::header_statement(product_id, req);
    let work = async {
        let mut tx = db.begin().await.map_err(tx_step("begin transaction"))?;

        if let Some(header) = header {
            let result = bind_query(sqlx::query(&header.sql), header.params)
                .execute(&mut *tx)
                .await
                .map_err(tx_step("update product"))?;
            if result.rows_affected() == 0 {
                return Err(ApiError::NotFound("product not found".into()));
            }
        }

        if let Some(category_id) = req.category_id {
            let result = sqlx::query(
                r#"
                UPDATE "products_categories"
                SET "category_id" = $1
                WHERE "product_id" = $2
                "#,
            )
            .bind(category_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(tx_step("update category"))?;
            if result.rows_affected() == 0 {
                return Err(ApiError::NotFound("product not found".into()));
            }
        }

        let mut replaced = Vec::new();
        if let Some(images) = &req.images {
            replaced = sqlx::query_as::<_, Image>(
                r#"
                DELETE FROM "images"
                WHERE "product_id" = $1
                RETURNING "id", "filename", "url"
                "#,
            )
            .bind(product_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(tx_step("delete images"))?;

            if let Some(insert) = update_builder::images_insert_statement(product_id, images) {
                bind_query(sqlx::query(&insert.sql), insert.params)
                    .execute(&mut *tx)
                    .await
                    .map_err(tx_step("insert images"))?;
            }
        }

        tx.commit().await.map_err(tx_step("commit"))?;
        Ok(replaced)
    };
    tokio::time::timeout(TX_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Removes a product and its dependent rows. Returns the deleted image rows
/// so the caller can clear the objects from storage.
pub async fn delete_product(db: &PgPool, product_id: Uuid) -> Result<Vec<Image>, ApiError> {
    let work = async {
        let mut tx = db.begin().await.map_err(tx_step("begin transaction"))?;

        let images = sqlx::query_as::<_, Image>(
            r#"
            DELETE FROM "images"
            WHERE "product_id" = $1
            RETURNING "id", "filename", "url"
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(tx_step("delete images"))?;

        sqlx::query(r#"DELETE FROM "products_categories" WHERE "product_id" = $1"#)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(tx_step("unlink category"))?;

        let result = sqlx::query(r#"DELETE FROM "products" WHERE "id" = $1"#)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .map_err(tx_step("delete product"))?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("product not found".into()));
        }

        tx.commit().await.map_err(tx_step("commit"))?;
        Ok(images)
    };
    tokio::time::timeout(TX_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}
