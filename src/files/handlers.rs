use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::auth::rbac::{self, ROLE_ADMIN};
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

use super::dto::{FileRef, FileRes, FileUpload};
use super::services;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(upload_files))
        .route("/files/delete", post(delete_files))
}

fn extension(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

/// Multipart upload. A `destination` text field, if present before the file
/// parts, becomes the key prefix; every file gets a fresh random name with
/// its original extension.
#[instrument(skip(state, multipart))]
async fn upload_files(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Envelope<Vec<FileRes>>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;

    let limit = state.config.storage.file_limit_bytes;
    let mut destination = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.file_name().is_none() {
            if field.name() == Some("destination") {
                destination = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?
                    .trim_matches('/')
                    .to_string();
            }
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let ext = extension(&filename)
            .map(str::to_lowercase)
            .filter(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| {
                ApiError::Validation(format!("unsupported file type: {filename}"))
            })?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        if data.len() > limit {
            return Err(ApiError::Validation(format!(
                "file too large: {filename}, limit is {limit} bytes"
            )));
        }

        let name = format!("{}.{ext}", Uuid::new_v4());
        let key = if destination.is_empty() {
            name
        } else {
            format!("{destination}/{name}")
        };
        files.push(FileUpload {
            destination: key,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(ApiError::Validation("no files in request".into()));
    }

    let uploaded = services::upload_batch(&state, files).await?;
    Ok(Envelope::new(uploaded))
}

#[instrument(skip(state, payload))]
async fn delete_files(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<Vec<FileRef>>,
) -> Result<Json<Envelope<&'static str>>, ApiError> {
    rbac::require_roles(&state, &caller, &[ROLE_ADMIN]).await?;
    if payload.is_empty() {
        return Err(ApiError::Validation("no files in request".into()));
    }
    let keys = payload.into_iter().map(|f| f.destination).collect();
    services::delete_batch(&state, keys).await?;
    Ok(Envelope::new("deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(extension("photo.PNG"), Some("PNG"));
        assert_eq!(extension("archive.tar.gz"), Some("gz"));
        assert_eq!(extension("noext"), None);
    }
}
