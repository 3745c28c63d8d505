//! Zip archiving of theme directories.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use stowage_core::prelude::*;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Request-scoped scratch directory. Removed with everything in it when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    /// Creates a fresh, unpredictably named directory under `root`.
    ///
    /// Blocking, like [`zip_folder`].
    pub fn create(root: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix("stowage-theme-")
            .tempdir_in(root)?;
        debug!(workspace = %dir.path().display(), "created archive workspace");
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        // Only `drop` takes the directory out.
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(workspace = %path.display(), "removed archive workspace"),
            Err(e) => warn!(workspace = %path.display(), "failed to remove archive workspace: {e}"),
        }
    }
}

/// Zips `src` recursively into `dest` and returns the archive size in bytes.
///
/// Blocking; run it on the blocking pool.
pub fn zip_folder(src: &Path, dest: &Path) -> Result<u64, StorageError> {
    if !src.is_dir() {
        return Err(StorageError::NotFound(src.display().to_string()));
    }

    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::Archive(e.to_string()))?;
        let path = entry.path();
        let name = entry_name(src, path)?;
        if name.is_empty() {
            continue;
        }

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), options)
                .map_err(archive_error)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options).map_err(archive_error)?;
            let mut input = File::open(path)?;
            io::copy(&mut input, &mut zip)?;
        }
    }

    zip.finish().map_err(archive_error)?;
    Ok(std::fs::metadata(dest)?.len())
}

/// Archive entry name of `path`: relative to `src`, `/` separated.
fn entry_name(src: &Path, path: &Path) -> Result<String, StorageError> {
    let relative: PathBuf = path
        .strip_prefix(src)
        .map_err(|e| StorageError::Archive(e.to_string()))?
        .to_path_buf();

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn archive_error(e: zip::result::ZipError) -> StorageError {
    StorageError::Archive(e.to_string())
}
