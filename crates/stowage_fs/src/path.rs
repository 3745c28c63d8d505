//! Directory layout policy and path-to-URL conversion.

use chrono::{DateTime, Datelike, Utc};
use std::path::{Component, Path, PathBuf};
use stowage_core::config::join_url;
use stowage_core::prelude::*;

/// Target directory for an upload made now: `base/YYYY/MM`.
pub fn target_dir(base: &Path) -> PathBuf {
    target_dir_at(base, Utc::now())
}

/// Target directory for an upload made at `at`.
///
/// Uploads within the same calendar month (UTC) share a directory.
pub fn target_dir_at(base: &Path, at: DateTime<Utc>) -> PathBuf {
    base.join(format!("{:04}", at.year()))
        .join(format!("{:02}", at.month()))
}

/// Public URL of `file`, which must live under `base`.
///
/// The URL is built from path components, so it only ever uses `/` no matter which
/// separator the host platform uses.
pub fn to_public_url(
    url_prefix: &str,
    rel_prefix: &str,
    base: &Path,
    file: &Path,
) -> Result<String, StorageError> {
    let relative = file
        .strip_prefix(base)
        .map_err(|_| outside_base(base, file))?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside_base(base, file)),
        }
    }

    Ok(join_url(
        [url_prefix, rel_prefix]
            .into_iter()
            .chain(segments.iter().map(String::as_str)),
    ))
}

/// Checks that `dir` is `base` or lies below it, without any `..` on the way.
///
/// The check is lexical; symlinks inside `base` are trusted.
pub fn ensure_within(base: &Path, dir: &Path) -> Result<(), StorageError> {
    let inside = dir.strip_prefix(base).is_ok_and(|rest| {
        rest.components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    });

    if inside {
        Ok(())
    } else {
        Err(outside_base(base, dir))
    }
}

/// Accepts `name` only if it is a single plain path component, e.g. `photo.jpg`.
///
/// Rejects empty names, `.`, `..`, roots and anything containing a separator.
pub fn file_component(name: &str) -> Result<&str, StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
        _ => Err(StorageError::InvalidPath(format!(
            "not a plain file name: {name}"
        ))),
    }
}

fn outside_base(base: &Path, file: &Path) -> StorageError {
    StorageError::InvalidPath(format!(
        "{} is not inside {}",
        file.display(),
        base.display()
    ))
}
