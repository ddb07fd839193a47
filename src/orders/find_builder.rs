use crate::entities::{BuiltQuery, SqlParam};

use super::dto::OrderFilter;

/// Builds the order listing queries. Each order row folds its lines into a
/// JSON array and derives `total_paid` from the line snapshots, so the page
/// reflects prices as they were at purchase time, not the live catalogue.
struct FindOrdersBuilder<'f> {
    filter: &'f OrderFilter,
    sql: String,
    params: Vec<SqlParam>,
}

impl<'f> FindOrdersBuilder<'f> {
    fn new(filter: &'f OrderFilter) -> Self {
        Self {
            filter,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn init_data_query(mut self) -> Self {
        self.sql.push_str(
            r#"
            SELECT
                array_to_json(array_agg("at"))
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
                WHERE 1 = 1"#,
        );
        self
    }

    fn init_count_query(mut self) -> Self {
        self.sql.push_str(
            r#"
            SELECT
                COUNT(*) AS "count"
            FROM "orders" "o"
            WHERE 1 = 1"#,
        );
        self
    }

    fn where_search(mut self) -> Self {
        if self.filter.search.is_empty() {
            return self;
        }
        let pattern = format!("%{}%", self.filter.search.to_lowercase());
        let p1 = self.param(SqlParam::Text(pattern.clone()));
        let p2 = self.param(SqlParam::Text(pattern.clone()));
        let p3 = self.param(SqlParam::Text(pattern));
        self.sql.push_str(&format!(
            r#"
                AND (
                    LOWER("o"."transfer_slip"::text) LIKE {p1} OR
                    LOWER("o"."address") LIKE {p2} OR
                    LOWER("o"."contact") LIKE {p3}
                )"#,
        ));
        self
    }

    fn where_status(mut self) -> Self {
        if self.filter.status.is_empty() {
            return self;
        }
        let p = self.param(SqlParam::Text(self.filter.status.to_lowercase()));
        self.sql
            .push_str(&format!("\n                AND \"o\".\"status\" = {p}"));
        self
    }

    fn where_date_window(mut self) -> Self {
        if self.filter.start_date.is_empty() || self.filter.end_date.is_empty() {
            return self;
        }
        let start = self.param(SqlParam::Text(self.filter.start_date.clone()));
        let end = self.param(SqlParam::Text(self.filter.end_date.clone()));
        // End bound is exclusive of the next day's midnight, so the whole of
        // end_date is included.
        self.sql.push_str(&format!(
            "\n                AND \"o\".\"created_at\" BETWEEN DATE({start}) AND DATE({end}) + 1",
        ));
        self
    }

    fn order_by(mut self) -> Self {
        let column = match self.filter.order_by.as_str() {
            "created_at" => r#""o"."created_at""#,
            _ => r#""o"."id""#,
        };
        let direction = if self.filter.sort_by.eq_ignore_ascii_case("desc") {
            "DESC"
        } else {
            "ASC"
        };
        self.sql
            .push_str(&format!(" ORDER BY {column} {direction}"));
        self
    }

    fn paginate(mut self) -> Self {
        let offset = self.param(SqlParam::Int(
            (self.filter.page - 1) * self.filter.limit,
        ));
        let limit = self.param(SqlParam::Int(self.filter.limit));
        self.sql
            .push_str(&format!(" OFFSET {offset} LIMIT {limit}"));
        self
    }

    fn close_data_query(mut self) -> Self {
        self.sql.push_str(
            r#"
            ) AS "at""#,
        );
        self
    }

    fn build(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

pub fn data_query(filter: &OrderFilter) -> BuiltQuery {
    FindOrdersBuilder::new(filter)
        .init_data_query()
        .where_search()
        .where_status()
        .where_date_window()
        .order_by()
        .paginate()
        .close_data_query()
        .build()
}

pub fn count_query(filter: &OrderFilter) -> BuiltQuery {
    FindOrdersBuilder::new(filter)
        .init_count_query()
        .where_search()
        .where_status()
        .where_date_window()
        .build()
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
            page: 1,
            limit: 10,
            order_by: String::new(),
            sort_by: String::new(),
        }
    }

    #[test]
    fn plain_query_paginates_only() {
        let q = data_query(&filter());
        assert!(q.sql.contains("array_to_json(array_agg(\"at\"))"));
        assert!(q.sql.contains("total_paid"));
        assert!(q.sql.contains("OFFSET $1 LIMIT $2"));
        assert_eq!(q.params, vec![SqlParam::Int(0), SqlParam::Int(10)]);
    }

    #[test]
    fn all_clauses_number_contiguously() {
        let mut f = filter();
        f.search = "Bangkok".into();
        f.status = "Waiting".into();
        f.start_date = "2024-01-01".into();
        f.end_date = "2024-02-01".into();
        f.page = 2;
        let q = data_query(&f);
        assert!(q.sql.contains("LIKE $1"));
        assert!(q.sql.contains("LIKE $2"));
        assert!(q.sql.contains("LIKE $3"));
        assert!(q.sql.contains(r#""o"."status" = $4"#));
        assert!(q.sql.contains("BETWEEN DATE($5) AND DATE($6) + 1"));
        assert!(q.sql.contains("OFFSET $7 LIMIT $8"));
        assert_eq!(q.params.len(), 8);
        assert_eq!(q.params[0], SqlParam::Text("%bangkok%".into()));
        assert_eq!(q.params[3], SqlParam::Text("waiting".into()));
        assert_eq!(q.params[6], SqlParam::Int(10));
    }

    #[test]
    fn status_only_filter_starts_at_one() {
        let mut f = filter();
        f.status = "shipping".into();
        let q = count_query(&f);
        assert!(q.sql.contains(r#""o"."status" = $1"#));
        assert_eq!(q.params, vec![SqlParam::Text("shipping".into())]);
    }

    #[test]
    fn sort_key_allow_list() {
        let mut f = filter();
        f.order_by = "total_paid".into();
        let q = data_query(&f);
        assert!(q.sql.contains(r#"ORDER BY "o"."id" ASC"#));

        f.order_by = "created_at".into();
        f.sort_by = "DESC".into();
        let q = data_query(&f);
        assert!(q.sql.contains(r#"ORDER BY "o"."created_at" DESC"#));
    }

    #[test]
    fn count_query_has_no_aggregation_or_paging() {
        let q = count_query(&filter());
        assert!(q.sql.contains("COUNT(*)"));
        assert!(!q.sql.contains("OFFSET"));
        assert!(q.params.is_empty());
    }
}
