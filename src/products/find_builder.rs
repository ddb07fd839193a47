use crate::entities::{BuiltQuery, SqlParam};

use super::dto::ProductFilter;

/// Builds the product listing queries. The data query nests the category as
/// a JSON object and the images as a JSON array so one row carries the whole
/// entity graph; the count query reuses the same predicates without the
/// aggregation. State lives only for one build and is consumed by value.
struct FindProductsBuilder<'f> {
    filter: &'f ProductFilter,
    sql: String,
    params: Vec<SqlParam>,
}

impl<'f> FindProductsBuilder<'f> {
    fn new(filter: &'f ProductFilter) -> Self {
        Self {
            filter,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its placeholder, `$1` onward.
    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn init_data_query(mut self) -> Self {
        self.sql.push_str(
            r#"
            SELECT
                array_to_json(array_agg("t"))
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
                WHERE 1 = 1"#,
        );
        self
    }

    fn init_count_query(mut self) -> Self {
        self.sql.push_str(
            r#"
            SELECT
                COUNT(*) AS "count"
            FROM "products" "p"
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
        let p2 = self.param(SqlParam::Text(pattern));
        self.sql.push_str(&format!(
            r#"
                AND (
                    LOWER("p"."title") LIKE {p1} OR
                    LOWER("p"."description") LIKE {p2}
                )"#,
        ));
        self
    }

    fn order_by(mut self) -> Self {
        // Sort keys map through a fixed table; raw input never reaches the
        // statement.
        let column = match self.filter.order_by.as_str() {
            "title" => r#""p"."title""#,
            "price" => r#""p"."price""#,
            "created_at" => r#""p"."created_at""#,
            _ => r#""p"."id""#,
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
            ) AS "t""#,
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

pub fn data_query(filter: &ProductFilter) -> BuiltQuery {
    FindProductsBuilder::new(filter)
        .init_data_query()
        .where_search()
        .order_by()
        .paginate()
        .close_data_query()
        .build()
}

pub fn count_query(filter: &ProductFilter) -> BuiltQuery {
    FindProductsBuilder::new(filter)
        .init_count_query()
        .where_search()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ProductFilter {
        ProductFilter {
            search: String::new(),
            page: 1,
            limit: 10,
            order_by: String::new(),
            sort_by: String::new(),
        }
    }

    #[test]
    fn plain_data_query_paginates_only() {
        let q = data_query(&filter());
        assert!(q.sql.contains("array_to_json"));
        assert!(q.sql.contains("OFFSET $1 LIMIT $2"));
        assert_eq!(q.params, vec![SqlParam::Int(0), SqlParam::Int(10)]);
    }

    #[test]
    fn search_parameters_precede_pagination() {
        let mut f = filter();
        f.search = "Mug".into();
        f.page = 3;
        let q = data_query(&f);
        assert!(q.sql.contains("LIKE $1"));
        assert!(q.sql.contains("LIKE $2"));
        assert!(q.sql.contains("OFFSET $3 LIMIT $4"));
        assert_eq!(
            q.params,
            vec![
                SqlParam::Text("%mug%".into()),
                SqlParam::Text("%mug%".into()),
                SqlParam::Int(20),
                SqlParam::Int(10),
            ]
        );
    }

    #[test]
    fn unknown_sort_key_falls_back_to_id() {
        let mut f = filter();
        f.order_by = "price; DROP TABLE products".into();
        let q = data_query(&f);
        assert!(q.sql.contains(r#"ORDER BY "p"."id" ASC"#));
        assert!(!q.sql.contains("DROP TABLE"));
    }

    #[test]
    fn sort_direction_normalized() {
        let mut f = filter();
        f.order_by = "price".into();
        f.sort_by = "desc".into();
        let q = data_query(&f);
        assert!(q.sql.contains(r#"ORDER BY "p"."price" DESC"#));

        f.sort_by = "sideways".into();
        let q = data_query(&f);
        assert!(q.sql.contains(r#"ORDER BY "p"."price" ASC"#));
    }

    #[test]
    fn count_query_shares_predicates_without_aggregation() {
        let mut f = filter();
        f.search = "tea".into();
        let q = count_query(&f);
        assert!(q.sql.contains("COUNT(*)"));
        assert!(!q.sql.contains("array_to_json"));
        assert!(!q.sql.contains("OFFSET"));
        assert_eq!(q.params.len(), 2);
    }
}
