//! HTTP handlers: static category serving and theme zip downloads.

use crate::archive::{Workspace, zip_folder};
use crate::path::file_component;
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, StatusCode, header},
    middleware::map_response,
    response::{IntoResponse, Response},
};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use stowage_core::prelude::*;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tower_http::services::ServeDir;
use tracing::{error, info, instrument};

/// One year, the cache lifetime of served assets.
pub const ONE_YEAR_SECS: u64 = 365 * 24 * 60 * 60;

/// Serves files below `root`. Missing files end in a 404 right here.
pub fn static_router(root: impl AsRef<Path>) -> Router {
    let serve_dir = ServeDir::new(root.as_ref()).append_index_html_on_directories(false);

    Router::new()
        .fallback_service(serve_dir)
        .layer(map_response(cache_forever))
}

async fn cache_forever(mut response: Response) -> Response {
    if response.status().is_success() {
        let value = format!("public, max-age={ONE_YEAR_SECS}");
        if let Ok(value) = HeaderValue::from_str(&value) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }
    response
}

/// Serves a zip of a single theme for every request it receives.
pub fn theme_router(theme_path: PathBuf, archive_root: PathBuf, name: String) -> Router {
    Router::new().fallback(move || {
        let theme_path = theme_path.clone();
        let archive_root = archive_root.clone();
        let name = name.clone();
        async move {
            download_theme(&theme_path, &archive_root, &name)
                .await
                .map_err(ThemeError)
        }
    })
}

/// Zips `theme_path/name` inside a fresh workspace and streams it back.
///
/// The workspace is created and filled on the blocking pool and only handed back once
/// the archive is complete, so a request dropped mid-archive still removes it after the
/// zip task ends. From then on it travels with the response body and is removed once the
/// body is done or dropped.
#[instrument(skip(theme_path, archive_root))]
pub async fn download_theme(
    theme_path: &Path,
    archive_root: &Path,
    name: &str,
) -> Result<Response, StorageError> {
    let source = theme_dir(theme_path, name)?;
    let zip_name = format!("{name}.zip");

    let root = archive_root.to_path_buf();
    let entry = zip_name.clone();
    let (workspace, length) = tokio::task::spawn_blocking(move || {
        let workspace = Workspace::create(&root)?;
        let length = zip_folder(&source, &workspace.path().join(&entry))?;
        Ok::<_, StorageError>((workspace, length))
    })
    .await
    .map_err(|e| StorageError::Archive(e.to_string()))
    .and_then(|archived| archived)
    .inspect_err(|e| error!("Failed to archive theme {name}: {e}"))?;

    let file = File::open(workspace.path().join(&zip_name)).await?;
    info!(size = length, "streaming theme archive");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{zip_name}\""))
        .map_err(|e| StorageError::InvalidPath(e.to_string()))?;

    let body = Body::from_stream(WorkspaceStream {
        inner: ReaderStream::new(file),
        _workspace: workspace,
    });

    Ok((
        [
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        body,
    )
        .into_response())
}

/// Theme names are a single plain path component that can be quoted in a header.
fn theme_dir(theme_path: &Path, name: &str) -> Result<PathBuf, StorageError> {
    let name = file_component(name)?;
    if name.chars().any(|c| c == '"' || c.is_control()) {
        return Err(StorageError::InvalidPath(format!("invalid theme name: {name:?}")));
    }
    Ok(theme_path.join(name))
}

/// File stream that keeps its workspace alive until the stream itself goes away.
struct WorkspaceStream {
    inner: ReaderStream<File>,
    _workspace: Workspace,
}

impl Stream for WorkspaceStream {
    type Item = std::io::Result<bytes::Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Theme download failure, rendered without a body.
#[derive(Debug)]
pub struct ThemeError(pub StorageError);

impl IntoResponse for ThemeError {
    fn into_response(self) -> Response {
        match self.0 {
            StorageError::NotFound(_) | StorageError::InvalidPath(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
        .into_response()
    }
}
