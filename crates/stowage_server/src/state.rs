use stowage_core::prelude::*;

/// Shared handler state. Paths and mounts come from `storage.config()`, so the server
/// never holds a configuration of its own.
#[derive(Clone)]
pub struct AppState<S: StorageBackend + Clone> {
    pub storage: S,
}
