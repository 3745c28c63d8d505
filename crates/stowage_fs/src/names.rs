//! Collision-free filename allocation.
//!
//! Allocation only checks for existence; nothing is reserved. A concurrent writer can
//! still create the returned path before the caller writes to it, in which case the
//! later write wins.

use std::path::{Path, PathBuf};
use stowage_core::prelude::*;
use tokio::fs;
use tracing::debug;

/// Upper bound on suffixed candidates tried before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 10_000;

/// Returns `dir/desired` if nothing is there, otherwise the first free
/// `dir/stem-N.ext` for `N = 1, 2, ...`.
pub async fn allocate(dir: &Path, desired: &str) -> Result<PathBuf, StorageError> {
    allocate_bounded(dir, desired, MAX_ALLOCATION_ATTEMPTS).await
}

pub(crate) async fn allocate_bounded(
    dir: &Path,
    desired: &str,
    max_attempts: usize,
) -> Result<PathBuf, StorageError> {
    let candidate = dir.join(desired);
    if !exists(&candidate).await {
        return Ok(candidate);
    }

    let (stem, ext) = split_extension(desired);
    for i in 1..=max_attempts {
        let candidate = dir.join(format!("{stem}-{i}{ext}"));
        if !exists(&candidate).await {
            debug!(desired, allocated = %candidate.display(), "name taken, using suffix");
            return Ok(candidate);
        }
    }

    Err(StorageError::NameExhausted {
        name: desired.to_string(),
        attempts: max_attempts,
    })
}

/// Any stat failure, not just `NotFound`, counts as absent.
pub async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}

/// Splits `name` into stem and extension, keeping the dot on the extension.
///
/// Leading dots belong to the stem, so `.env` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[..idx].ends_with('.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Replaces everything but ASCII alphanumerics, `_`, `@` and `.` with `-`.
///
/// Only the file's base name is kept, so client supplied directories never reach the
/// filesystem.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = split_extension(base);
    let clean = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '.') {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    };

    let sanitized = format!("{}{}", clean(stem), clean(ext));
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        sanitized
    }
}
