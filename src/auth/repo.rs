use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role_id: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserCredential {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub username: String,
    pub role_id: i32,
}

/// One row per live session: the presented access token must still match
/// this record for the session to be trusted.
#[derive(Debug, Clone, FromRow)]
pub struct OauthSession {
    pub id: Uuid,
    pub user_id: Uuid,
}

pub async fn insert_user(
    db: &PgPool,
    email: &str,
    password_hash: &str,
    username: &str,
    role_id: i32,
) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO "users" ("email", "password", "username", "role_id")
        VALUES ($1, $2, $3, $4)
        RETURNING "id", "email", "username", "role_id"
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(username)
    .bind(role_id)
    .fetch_one(db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            ApiError::Conflict("username or email already exists".into())
        }
        _ => ApiError::from(e),
    })
}

pub async fn find_user_by_email(db: &PgPool, email: &str) -> Result<UserCredential, ApiError> {
    sqlx::query_as::<_, UserCredential>(
        r#"
        SELECT "id", "email", "password", "username", "role_id"
        FROM "users"
        WHERE "email" = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT "id", "email", "username", "role_id"
        FROM "users"
        WHERE "id" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

pub async fn insert_oauth(
    db: &PgPool,
    user_id: Uuid,
    access_token: &str,
    refresh_token: &str,
) -> Result<Uuid, ApiError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO "oauth" ("user_id", "access_token", "refresh_token")
        VALUES ($1, $2, $3)
        RETURNING "id"
        "#,
    )
    .bind(user_id)
    .bind(access_token)
    .bind(refresh_token)
    .fetch_one(db)
    .await?;
    Ok(id)
}

pub async fn find_oauth_by_refresh(
    db: &PgPool,
    refresh_token: &str,
) -> Result<OauthSession, ApiError> {
    sqlx::query_as::<_, OauthSession>(
        r#"
        SELECT "id", "user_id"
        FROM "oauth"
        WHERE "refresh_token" = $1
        "#,
    )
    .bind(refresh_token)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::NotFound("session not found".into()))
}

pub async fn update_oauth(
    db: &PgPool,
    oauth_id: Uuid,
    access_token: &str,
    refresh_token: &str,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE "oauth"
        SET "access_token" = $1, "refresh_token" = $2
        WHERE "id" = $3
        "#,
    )
    .bind(access_token)
    .bind(refresh_token)
    .bind(oauth_id)
    .execute(db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("session not found".into()));
    }
    Ok(())
}

pub async fn delete_oauth(db: &PgPool, oauth_id: Uuid) -> Result<(), ApiError> {
    let result = sqlx::query(r#"DELETE FROM "oauth" WHERE "id" = $1"#)
        .bind(oauth_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("session not found".into()));
    }
    Ok(())
}

/// True when exactly one live session pairs this user with this access token.
pub async fn has_access_token(
    db: &PgPool,
    user_id: Uuid,
    access_token: &str,
) -> Result<bool, ApiError> {
    let check = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT (CASE WHEN COUNT(*) = 1 THEN true ELSE false END)
        FROM "oauth"
        WHERE "user_id" = $1
        AND "access_token" = $2
        "#,
    )
    .bind(user_id)
    .bind(access_token)
    .fetch_one(db)
    .await?;
    Ok(check)
}

pub async fn count_roles(db: &PgPool) -> Result<usize, ApiError> {
    let count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "roles""#)
        .fetch_one(db)
        .await?;
    Ok(count as usize)
}
