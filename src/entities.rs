use serde::Serialize;
use sqlx::postgres::PgArguments;
use sqlx::query::{Query, QueryScalar};
use sqlx::Postgres;
use uuid::Uuid;

/// Positional parameter collected by the query builders. Bound in order onto
/// the final statement, so the `$n` placeholders in the builder output always
/// line up with the vector index + 1.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
    Uuid(Uuid),
}

/// A finished statement from one of the query builders: SQL text plus the
/// positional parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

pub fn bind_query(
    mut query: Query<'_, Postgres, PgArguments>,
    params: Vec<SqlParam>,
) -> Query<'_, Postgres, PgArguments> {
    for p in params {
        query = match p {
            SqlParam::Text(v) => query.bind(v),
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Json(v) => query.bind(v),
            SqlParam::Uuid(v) => query.bind(v),
        };
    }
    query
}

pub fn bind_query_scalar<O>(
    mut query: QueryScalar<'_, Postgres, O, PgArguments>,
    params: Vec<SqlParam>,
) -> QueryScalar<'_, Postgres, O, PgArguments> {
    for p in params {
        query = match p {
            SqlParam::Text(v) => query.bind(v),
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Json(v) => query.bind(v),
            SqlParam::Uuid(v) => query.bind(v),
        };
    }
    query
}

/// Paginated listing response shared by the order and product find endpoints.
#[derive(Debug, Serialize)]
pub struct Paginate<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total_item: i64,
    pub total_page: i64,
}

impl<T> Paginate<T> {
    pub fn new(data: Vec<T>, page: i64, limit: i64, total_item: i64) -> Self {
        let total_page = if limit > 0 {
            (total_item + limit - 1) / limit
        } else {
            0
        };
        Self {
            data,
            page,
            limit,
            total_item,
            total_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_total_pages_round_up() {
        let p = Paginate::new(vec![1, 2, 3], 1, 5, 13);
        assert_eq!(p.total_page, 3);
        let p = Paginate::<i32>::new(vec![], 1, 5, 10);
        assert_eq!(p.total_page, 2);
        let p = Paginate::<i32>::new(vec![], 1, 5, 0);
        assert_eq!(p.total_page, 0);
    }
}
