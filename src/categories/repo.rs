use sqlx::PgPool;

use crate::error::ApiError;

use super::dto::Category;

pub async fn find_categories(db: &PgPool, title: &str) -> Result<Vec<Category>, ApiError> {
    let rows = if title.is_empty() {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT "id", "title"
            FROM "categories"
            ORDER BY "id"
            "#,
        )
        .fetch_all(db)
        .await?
    } else {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT "id", "title"
            FROM "categories"
            WHERE LOWER("title") LIKE $1
            ORDER BY "id"
            "#,
        )
        .bind(format!("%{}%", title.to_lowercase()))
        .fetch_all(db)
        .await?
    };
    Ok(rows)
}

pub async fn insert_category(db: &PgPool, title: &str) -> Result<Category, ApiError> {
    sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO "categories" ("title")
        VALUES ($1)
        RETURNING "id", "title"
        "#,
    )
    .bind(title)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            ApiError::Conflict("category already exists".into())
        }
        _ => ApiError::from(e),
    })
}

pub async fn delete_category(db: &PgPool, category_id: i32) -> Result<(), ApiError> {
    let result = sqlx::query(r#"DELETE FROM "categories" WHERE "id" = $1"#)
        .bind(category_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("category not found".into()));
    }
    Ok(())
}
