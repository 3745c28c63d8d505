use crate::state::AppState;

use axum::{
    Json,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use std::path::{Component, PathBuf};
use stowage_core::prelude::*;
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;
use tracing::debug;

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0
            .downcast_ref::<StorageError>()
            .map(|storage_err| match storage_err {
                StorageError::IncorrectUsage(_) | StorageError::InvalidPath(_) => {
                    (StatusCode::BAD_REQUEST, storage_err.to_string())
                }
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "Asset not found".to_string()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, storage_err.to_string()),
            })
            .unwrap_or_else(|| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal Server Error: {}", self.0),
                )
            })
            .into_response()
    }
}

#[derive(serde::Deserialize)]
pub struct UploadParams {
    /// Client-side filename, used to derive the stored name.
    filename: String,
}

/// POST /uploads/{category}?filename=photo.jpg
///
/// Streams the raw body into a temp file, hands it to the storage and returns the
/// public URL. The temp file is removed when the handler returns.
pub async fn upload<S: StorageBackend>(
    State(state): State<AppState<S>>,
    Path(category): Path<String>,
    Query(params): Query<UploadParams>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let tmp = tokio::task::spawn_blocking(tempfile::NamedTempFile::new).await??;
    let mut file = tokio::fs::File::create(tmp.path()).await?;

    let mut stream = request
        .into_body()
        .into_data_stream()
        .map_err(std::io::Error::other);
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    let upload = UploadedFile::new(tmp.path(), params.filename);
    let url = state.storage.save(&upload, &category, None).await?;
    debug!(%url, "upload stored");

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "url": url }))))
}

/// DELETE /uploads/{category}/{*path}
///
/// `path` is relative to the category's base directory, e.g. `2024/05/photo.jpg`.
pub async fn delete<S: StorageBackend>(
    State(state): State<AppState<S>>,
    Path((category, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let paths = state.storage.config().category(&category, &path)?;
    let relative = plain_relative_path(&path)?;

    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| StorageError::InvalidPath(path.clone()))?;
    let dir = relative
        .parent()
        .map(|parent| paths.path.join(parent))
        .unwrap_or_else(|| paths.path.clone());

    state.storage.delete(&file_name, Some(dir.as_path())).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /themes/{name}/download
pub async fn download_theme<S: StorageBackend>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let handler = state.storage.serve(ServeOptions::theme(name.as_str()))?;

    Ok(handler.oneshot(request).await.into_response())
}

/// Accepts only `a/b/c` style paths: no roots, no `..`, nothing empty.
fn plain_relative_path(path: &str) -> Result<PathBuf, StorageError> {
    let relative = PathBuf::from(path);
    let plain = !path.is_empty()
        && !path.contains('\\')
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    plain
        .then_some(relative)
        .ok_or_else(|| StorageError::InvalidPath(path.to_string()))
}
