use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The asset category is not configured. Raised before any filesystem access.
    #[error("Incorrect file type was specified for: {0}")]
    IncorrectUsage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("No free file name for '{name}' after {attempts} attempts")]
    NameExhausted { name: String, attempts: usize },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Generic(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
