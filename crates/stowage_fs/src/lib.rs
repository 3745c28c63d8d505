//! # Stowage FileSystem Storage
//!
//! A local filesystem backend for Stowage.
//!
//! This crate implements the [`StorageBackend`] trait, storing uploads below each
//! category's base directory in monthly subdirectories (`images/2024/05/photo.jpg`).
//!
//! ## Features
//!
//! * **No silent overwrites**: a taken name is stored as `photo-1.jpg`, `photo-2.jpg`, ...
//! * **Static serving**: missing files are a hard 404, hits are cacheable for a year.
//! * **Theme downloads**: themes are zipped into a per-request workspace that is removed
//!   once the response is finished, whatever the outcome.
//!
//! ## Usage
//!
//! ```no_run
//! use stowage_core::prelude::*;
//! use stowage_fs::LocalFileStore;
//!
//! let config = StorageConfig::new("./content/themes")
//!     .with_url_prefix("/content")
//!     .with_category("images", "./content/images", "images");
//! let storage = LocalFileStore::new(config);
//! ```

pub mod archive;
pub mod names;
pub mod path;
pub mod serve;

pub use names::MAX_ALLOCATION_ATTEMPTS;
pub use serve::ONE_YEAR_SECS;

use axum::response::Response;
use axum::Router;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stowage_core::prelude::*;
use tokio::fs;
use tracing::{debug, error, instrument};

#[derive(Clone, Debug)]
pub struct LocalFileStore {
    config: Arc<StorageConfig>,
}

impl LocalFileStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Default directory for new uploads of `category`.
    pub fn target_dir(&self, category: &str) -> Result<PathBuf, StorageError> {
        let paths = self.config.category(category, category)?;
        Ok(path::target_dir(&paths.path))
    }

    /// Streams a zip of the theme called `name`.
    pub async fn download_theme(&self, name: &str) -> Result<Response, StorageError> {
        serve::download_theme(&self.config.theme_path, &self.config.archive_root(), name).await
    }

    /// The configured category whose base directory contains `dir`.
    fn owning_category(&self, dir: &Path) -> Result<&CategoryPaths, StorageError> {
        self.config
            .categories
            .values()
            .find(|paths| path::ensure_within(&paths.path, dir).is_ok())
            .ok_or_else(|| {
                StorageError::InvalidPath(format!(
                    "{} is not inside any category",
                    dir.display()
                ))
            })
    }

    async fn store(
        &self,
        file: &UploadedFile,
        paths: &CategoryPaths,
        target_dir: Option<&Path>,
    ) -> Result<String, StorageError> {
        let target_dir = match target_dir {
            Some(dir) => {
                path::ensure_within(&paths.path, dir)?;
                dir.to_path_buf()
            }
            None => path::target_dir(&paths.path),
        };

        let desired = names::sanitize_file_name(&file.name);
        let target = names::allocate(&target_dir, &desired).await?;

        fs::create_dir_all(&target_dir).await?;
        fs::copy(&file.path, &target).await?;
        debug!(target = %target.display(), "copied upload into place");

        path::to_public_url(&self.config.url_prefix, &paths.rel_path, &paths.path, &target)
    }
}

impl StorageBackend for LocalFileStore {
    fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[instrument(skip(self, file, target_dir), fields(file = %file.name))]
    async fn save(
        &self,
        file: &UploadedFile,
        category: &str,
        target_dir: Option<&Path>,
    ) -> Result<String, StorageError> {
        let paths = self.config.category(category, &file.name)?;

        self.store(file, paths, target_dir)
            .await
            .inspect_err(|e| error!("Failed to save {}: {e}", file.name))
    }

    async fn exists(&self, path: &Path) -> bool {
        names::exists(path).await
    }

    #[instrument(skip(self, target_dir))]
    async fn delete(&self, file_name: &str, target_dir: Option<&Path>) -> Result<(), StorageError> {
        let file_name = path::file_component(file_name)?;
        let target_dir = match target_dir {
            Some(dir) => {
                self.owning_category(dir)?;
                dir.to_path_buf()
            }
            None => self.target_dir(&self.config.default_category)?,
        };

        remove(&target_dir.join(file_name))
            .await
            .inspect_err(|e| error!("Failed to delete {file_name}: {e}"))
    }

    fn serve(&self, options: ServeOptions) -> Result<Router, StorageError> {
        match options {
            ServeOptions::Theme { name } => Ok(serve::theme_router(
                self.config.theme_path.clone(),
                self.config.archive_root(),
                name,
            )),
            ServeOptions::Static { category } => {
                let category = category.unwrap_or_else(|| self.config.default_category.clone());
                let paths = self.config.category(&category, &category)?;
                Ok(serve::static_router(&paths.path))
            }
        }
    }
}

/// Removes a file or a whole directory. Absent paths are not an error.
async fn remove(path: &Path) -> Result<(), StorageError> {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "nothing to delete");
            Ok(())
        }
        Err(e) => Err(StorageError::Io(e)),
    }
}
