use crate::config::StorageConfig;
use crate::error::*;

use axum::Router;
use std::path::{Path, PathBuf};

/// A file handed over by the upload layer.
///
/// The upload layer owns `path` and removes it after [`StorageBackend::save`] returns.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Temporary location of the uploaded bytes.
    pub path: PathBuf,

    /// Filename as sent by the client, e.g. `photo.jpg`.
    pub name: String,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// What [`StorageBackend::serve`] should build a handler for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeOptions {
    /// Plain static serving of a category's files.
    Static { category: Option<String> },

    /// Zip download of a single theme directory.
    Theme { name: String },
}

impl Default for ServeOptions {
    fn default() -> Self {
        ServeOptions::Static { category: None }
    }
}

impl ServeOptions {
    pub fn category(category: impl Into<String>) -> Self {
        ServeOptions::Static {
            category: Some(category.into()),
        }
    }

    pub fn theme(name: impl Into<String>) -> Self {
        ServeOptions::Theme { name: name.into() }
    }
}

pub trait StorageBackend: Send + Sync + 'static + Clone {
    /// The configuration this backend stores and serves with.
    fn config(&self) -> &StorageConfig;

    /// Stores `file` under `category` and returns its public URL.
    ///
    /// `target_dir` overrides the backend's directory layout policy.
    fn save(
        &self,
        file: &UploadedFile,
        category: &str,
        target_dir: Option<&Path>,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Never fails; anything that prevents a stat counts as absent.
    fn exists(&self, path: &Path) -> impl Future<Output = bool> + Send;

    /// Removes `file_name` from `target_dir` (or the default location).
    ///
    /// Removing something that is not there succeeds.
    fn delete(
        &self,
        file_name: &str,
        target_dir: Option<&Path>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Builds a request handler that can be nested into the host's router.
    fn serve(&self, options: ServeOptions) -> Result<Router, StorageError>;
}
