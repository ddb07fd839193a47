use tracing::warn;
use uuid::Uuid;

use crate::entities::Paginate;
use crate::error::ApiError;
use crate::files;
use crate::state::AppState;

use super::dto::{CreateProductRequest, Image, Product, ProductFilter, UpdateProductRequest};
use super::repo;

/// Post-commit object cleanup. The rows are already gone, so a storage fault
/// here must not fail the request; it is logged and the orphaned objects can
/// be removed later.
async fn cleanup_objects(state: &AppState, images: Vec<Image>) {
    if images.is_empty() {
        return;
    }
    let keys: Vec<String> = images.into_iter().map(|i| i.filename).collect();
    if let Err(e) = files::services::delete_batch(state, keys).await {
        warn!(error = %e, "stored objects left behind after commit");
    }
}

fn validate_create(req: &CreateProductRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    if req.price <= 0.0 {
        return Err(ApiError::Validation("price must be positive".into()));
    }
    if req.category_id < 1 {
        return Err(ApiError::Validation("category_id is required".into()));
    }
    Ok(())
}

pub async fn find_products(
    state: &AppState,
    filter: ProductFilter,
) -> Result<Paginate<Product>, ApiError> {
    let filter = filter.normalized();
    let (products, total) = repo::find_products(&state.db, &filter).await?;
    Ok(Paginate::new(products, filter.page, filter.limit, total))
}

pub async fn find_one_product(state: &AppState, product_id: Uuid) -> Result<Product, ApiError> {
    repo::find_one_product(&state.db, product_id).await
}

pub async fn create_product(
    state: &AppState,
    req: CreateProductRequest,
) -> Result<Product, ApiError> {
    validate_create(&req)?;
    let product_id = repo::insert_product(&state.db, &req).await?;
    repo::find_one_product(&state.db, product_id).await
}

pub async fn update_product(
    state: &AppState,
    product_id: Uuid,
    req: UpdateProductRequest,
) -> Result<Product, ApiError> {
    if req.title.is_none()
        && req.description.is_none()
        && req.price.is_none()
        && req.category_id.is_none()
        && req.images.is_none()
    {
        return Err(ApiError::Validation("no fields to update".into()));
    }
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("title cannot be empty".into()));
        }
    }
    if let Some(price) = req.price {
        if price <= 0.0 {
            return Err(ApiError::Validation("price must be positive".into()));
        }
    }

    let replaced = repo::update_product(&state.db, product_id, &req).await?;
    cleanup_objects(state, replaced).await;
    repo::find_one_product(&state.db, product_id).await
}

pub async fn delete_product(state: &AppState, product_id: Uuid) -> Result<(), ApiError> {
    let images = repo::delete_product(&state.db, product_id).await?;
    cleanup_objects(state, images).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::dto::ImageRef;

    fn create_req() -> CreateProductRequest {
        CreateProductRequest {
            title: "Teapot".into(),
            description: "ceramic".into(),
            price: 12.5,
            category_id: 1,
            images: vec![ImageRef {
                filename: "teapot.png".into(),
                url: "https://cdn/teapot.png".into(),
            }],
        }
    }

    #[test]
    fn create_validation() {
        assert!(validate_create(&create_req()).is_ok());

        let mut req = create_req();
        req.title = "  ".into();
        assert!(matches!(
            validate_create(&req),
            Err(ApiError::Validation(_))
        ));

        let mut req = create_req();
        req.price = 0.0;
        assert!(matches!(
            validate_create(&req),
            Err(ApiError::Validation(_))
        ));

        let mut req = create_req();
        req.category_id = 0;
        assert!(matches!(
            validate_create(&req),
            Err(ApiError::Validation(_))
        ));
    }

    // The rows are committed by the time objects are cleaned up, so a broken
    // storage backend must not turn a successful write into an error.
    #[tokio::test]
    async fn cleanup_tolerates_storage_faults() {
        use crate::storage::StorageClient;
        use axum::async_trait;
        use bytes::Bytes;
        use std::sync::Arc;

        struct FailingStorage;

        #[async_trait]
        impl StorageClient for FailingStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("bucket unavailable"))
            }
            async fn delete_object(&self, _k: &str) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("bucket unavailable"))
            }
        }

        let fake = AppState::fake();
        let state = AppState::from_parts(fake.db, fake.config, Arc::new(FailingStorage));
        let images = vec![Image {
            id: Uuid::new_v4(),
            filename: "orphan.png".into(),
            url: "https://cdn/orphan.png".into(),
        }];
        cleanup_objects(&state, images).await;
    }
}
