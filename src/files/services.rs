use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{FileRes, FileUpload};

/// At most this many storage calls run at once per batch.
const WORKERS: usize = 5;
/// Whole-batch deadline; a stuck storage backend fails the request rather
/// than holding the connection open.
const BATCH_DEADLINE: Duration = Duration::from_secs(60);

/// Uploads a batch through a bounded worker pool. The first failure aborts
/// the remaining work and fails the whole batch.
pub async fn upload_batch(
    state: &AppState,
    files: Vec<FileUpload>,
) -> Result<Vec<FileRes>, ApiError> {
    let storage = state.storage.clone();
    let public_url = state.config.storage.public_url.clone();
    let semaphore = Arc::new(Semaphore::new(WORKERS));

    let work = async {
        let mut set = JoinSet::new();
        for file in files {
            let storage = storage.clone();
            let public_url = public_url.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| anyhow::anyhow!("worker pool closed: {e}"))?;
                storage
                    .put_object(&file.destination, file.data, &file.content_type)
                    .await?;
                Ok::<_, anyhow::Error>(FileRes {
                    url: format!("{}/{}", public_url, file.destination),
                    filename: file.destination,
                })
            });
        }

        let mut uploaded = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(res)) => uploaded.push(res),
                Ok(Err(e)) => {
                    set.abort_all();
                    return Err(ApiError::Storage(e.to_string()));
                }
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(ApiError::Storage(e.to_string())),
            }
        }
        Ok(uploaded)
    };

    tokio::time::timeout(BATCH_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}

/// Deletes a batch of object keys through the same bounded pool, with the
/// same first-failure abort.
pub async fn delete_batch(state: &AppState, keys: Vec<String>) -> Result<(), ApiError> {
    let storage = state.storage.clone();
    let semaphore = Arc::new(Semaphore::new(WORKERS));

    let work = async {
        let mut set = JoinSet::new();
        for key in keys {
            let storage = storage.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| anyhow::anyhow!("worker pool closed: {e}"))?;
                storage.delete_object(&key).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    set.abort_all();
                    return Err(ApiError::Storage(e.to_string()));
                }
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(ApiError::Storage(e.to_string())),
            }
        }
        Ok(())
    };

    tokio::time::timeout(BATCH_DEADLINE, work)
        .await
        .map_err(|_| ApiError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::storage::StorageClient;
    use axum::async_trait;
    use bytes::Bytes;

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

    fn failing_state() -> AppState {
        let fake = AppState::fake();
        AppState::from_parts(fake.db, fake.config, Arc::new(FailingStorage))
    }

    fn upload(name: &str) -> FileUpload {
        FileUpload {
            destination: name.into(),
            content_type: "image/png".into(),
            data: Bytes::from_static(b"png-bytes"),
        }
    }

    #[tokio::test]
    async fn upload_batch_returns_public_urls() {
        let state = AppState::fake();
        let mut res = upload_batch(&state, vec![upload("a.png"), upload("b.png")])
            .await
            .unwrap();
        res.sort_by(|a, b| a.filename.cmp(&b.filename));
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].filename, "a.png");
        assert_eq!(res[0].url, "https://fake.local/fake/a.png");
    }

    #[tokio::test]
    async fn upload_batch_fails_fast() {
        let state = failing_state();
        let files = (0..20).map(|i| upload(&format!("{i}.png"))).collect();
        let err = upload_batch(&state, files).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
    }

    #[tokio::test]
    async fn delete_batch_propagates_failure() {
        let state = failing_state();
        let err = delete_batch(&state, vec!["a.png".into()]).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));

        let ok_state = AppState::fake();
        assert!(delete_batch(&ok_state, vec!["a.png".into()]).await.is_ok());
    }

    #[tokio::test]
    async fn empty_batches_are_noops() {
        let state = AppState::fake();
        assert!(upload_batch(&state, Vec::new()).await.unwrap().is_empty());
        assert!(delete_batch(&state, Vec::new()).await.is_ok());
    }
}
