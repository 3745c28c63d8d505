use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Where a category of assets lives on disk and under which URL segment it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPaths {
    /// Absolute base directory, e.g. `/data/images`.
    pub path: PathBuf,

    /// URL segment appended to [`StorageConfig::url_prefix`], e.g. `images`.
    pub rel_path: String,
}

/// Storage configuration, loaded by the host and handed to a backend at construction.
///
/// ```toml
/// url_prefix = "/content"
/// theme_path = "/data/themes"
///
/// [categories.images]
/// path = "/data/images"
/// rel_path = "images"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Mount prefix of every public URL.
    ///
    /// Defaults to `""`, which yields URLs like `/images/2024/05/photo.jpg`.
    #[serde(default)]
    pub url_prefix: String,

    /// Category used when serving or deleting without an explicit one.
    ///
    /// Defaults to `images`.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Configured categories, keyed by name (`images`, `documents`, ...).
    #[serde(default)]
    pub categories: HashMap<String, CategoryPaths>,

    /// Directory holding one subdirectory per installed theme.
    pub theme_path: PathBuf,

    /// Where per-request archive workspaces are created.
    ///
    /// Defaults to the system temp directory.
    #[serde(default)]
    pub archive_tmp_dir: Option<PathBuf>,
}

/// Joins `parts` into an absolute URL path.
///
/// Parts are split on both `/` and `\` and empty segments dropped, so the result never
/// contains a backslash or a doubled slash. No parts at all yields `""`.
pub fn join_url<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut url = String::new();
    for segment in parts.into_iter().flat_map(url_segments) {
        url.push('/');
        url.push_str(segment);
    }
    url
}

fn url_segments(part: &str) -> impl Iterator<Item = &str> {
    part.split(['/', '\\']).filter(|segment| !segment.is_empty())
}

fn default_category() -> String {
    "images".to_string()
}

impl StorageConfig {
    pub fn new(theme_path: impl Into<PathBuf>) -> Self {
        Self {
            url_prefix: String::new(),
            default_category: default_category(),
            categories: HashMap::new(),
            theme_path: theme_path.into(),
            archive_tmp_dir: None,
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn with_category(
        mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        rel_path: impl Into<String>,
    ) -> Self {
        self.categories.insert(
            name.into(),
            CategoryPaths {
                path: path.into(),
                rel_path: rel_path.into(),
            },
        );
        self
    }

    pub fn with_archive_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_tmp_dir = Some(dir.into());
        self
    }

    /// Looks up a category.
    ///
    /// `asset` only names the offending file in the error; an empty category, a missing
    /// entry, or an entry with an empty base path or URL segment are all usage errors.
    pub fn category(&self, category: &str, asset: &str) -> Result<&CategoryPaths, StorageError> {
        self.categories
            .get(category)
            .filter(|paths| {
                !category.is_empty()
                    && !paths.path.as_os_str().is_empty()
                    && url_segments(&paths.rel_path).next().is_some()
            })
            .ok_or_else(|| StorageError::IncorrectUsage(asset.to_string()))
    }

    /// Where `paths` is published: `/{url_prefix}/{rel_path}`.
    pub fn mount_path(&self, paths: &CategoryPaths) -> String {
        join_url([self.url_prefix.as_str(), paths.rel_path.as_str()])
    }

    pub fn archive_root(&self) -> PathBuf {
        self.archive_tmp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
