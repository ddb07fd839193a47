use uuid::Uuid;

use crate::entities::{BuiltQuery, SqlParam};

use super::dto::{ImageRef, UpdateProductRequest};

/// Builds the partial-update header statement for a product. Only fields
/// present in the request contribute a SET fragment, and placeholders stay
/// contiguous however many are skipped. A request that touches no header
/// column yields no statement at all.
pub fn header_statement(product_id: Uuid, req: &UpdateProductRequest) -> Option<BuiltQuery> {
    let mut sets: Vec<String> = Vec::new();
    let mut params: Vec<SqlParam> = Vec::new();

    let push = |sets: &mut Vec<String>, params: &mut Vec<SqlParam>, column: &str, value: SqlParam| {
        params.push(value);
        sets.push(format!(r#""{}" = ${}"#, column, params.len()));
    };

    if let Some(title) = &req.title {
        push(&mut sets, &mut params, "title", SqlParam::Text(title.clone()));
    }
    if let Some(description) = &req.description {
        push(
            &mut sets,
            &mut params,
            "description",
            SqlParam::Text(description.clone()),
        );
    }
    if let Some(price) = req.price {
        push(&mut sets, &mut params, "price", SqlParam::Float(price));
    }

    if sets.is_empty() {
        return None;
    }

    params.push(SqlParam::Uuid(product_id));
    let sql = format!(
        r#"
        UPDATE "products" SET
            {}
        WHERE "id" = ${}"#,
        sets.join(",\n            "),
        params.len(),
    );
    Some(BuiltQuery { sql, params })
}

/// Bulk image insert shared by the create and update paths, one placeholder
/// group of three per image.
pub fn images_insert_statement(product_id: Uuid, images: &[ImageRef]) -> Option<BuiltQuery> {
    if images.is_empty() {
        return None;
    }
    let mut params: Vec<SqlParam> = Vec::with_capacity(images.len() * 3);
    let mut groups: Vec<String> = Vec::with_capacity(images.len());
    for image in images {
        params.push(SqlParam::Text(image.filename.clone()));
        params.push(SqlParam::Text(image.url.clone()));
        params.push(SqlParam::Uuid(product_id));
        let n = params.len();
        groups.push(format!("(${}, ${}, ${})", n - 2, n - 1, n));
    }
    let sql = format!(
        r#"
        INSERT INTO "images" (
            "filename",
            "url",
            "product_id"
        )
        VALUES {}"#,
        groups.join(", "),
    );
    Some(BuiltQuery { sql, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supplied_fields_produce_fragments() {
        let id = Uuid::new_v4();
        let req = UpdateProductRequest {
            price: Some(19.5),
            ..Default::default()
        };
        let q = header_statement(id, &req).unwrap();
        assert!(q.sql.contains(r#""price" = $1"#));
        assert!(q.sql.contains(r#"WHERE "id" = $2"#));
        assert!(!q.sql.contains("title"));
        assert_eq!(q.params, vec![SqlParam::Float(19.5), SqlParam::Uuid(id)]);
    }

    #[test]
    fn placeholders_stay_contiguous_when_fields_are_skipped() {
        let id = Uuid::new_v4();
        let req = UpdateProductRequest {
            title: Some("Kettle".into()),
            price: Some(42.0),
            ..Default::default()
        };
        let q = header_statement(id, &req).unwrap();
        assert!(q.sql.contains(r#""title" = $1"#));
        assert!(q.sql.contains(r#""price" = $2"#));
        assert!(q.sql.contains(r#"WHERE "id" = $3"#));
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn empty_request_yields_no_statement() {
        let req = UpdateProductRequest::default();
        assert!(header_statement(Uuid::new_v4(), &req).is_none());
    }

    #[test]
    fn image_groups_number_contiguously() {
        let id = Uuid::new_v4();
        let images = vec![
            ImageRef {
                filename: "a.png".into(),
                url: "https://cdn/a.png".into(),
            },
            ImageRef {
                filename: "b.png".into(),
                url: "https://cdn/b.png".into(),
            },
        ];
        let q = images_insert_statement(id, &images).unwrap();
        assert!(q.sql.contains("($1, $2, $3), ($4, $5, $6)"));
        assert_eq!(q.params.len(), 6);
        assert!(images_insert_statement(id, &[]).is_none());
    }
}
