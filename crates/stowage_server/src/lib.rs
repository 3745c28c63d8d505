use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{delete, get, post},
};
use stowage_core::prelude::*;
use tower_http::trace::TraceLayer;
use tracing::info;

mod api;

pub mod state;

use state::AppState;

/// The builder for the Stowage server.
#[derive(Clone, Debug, Default)]
pub struct StowageServer;

impl StowageServer {
    pub fn new() -> Self {
        Self
    }

    /// Wires `storage` into a router.
    ///
    /// Every category in the backend's configuration is served statically under
    /// `{url_prefix}/{rel_path}`, so the URLs returned by uploads resolve.
    pub fn build<S: StorageBackend>(self, storage: S) -> Result<Router, StorageError> {
        let mut router = Router::new();

        let config = storage.config();
        let mut categories: Vec<_> = config.categories.keys().collect();
        categories.sort();
        for name in categories {
            let paths = config.category(name, name)?;
            let mount = config.mount_path(paths);
            info!(category = %name, %mount, "serving category");
            router = router.nest_service(&mount, storage.serve(ServeOptions::category(name))?);
        }

        let state = AppState { storage };

        Ok(router
            .route("/health", get(|| async { "OK" }))
            .route("/themes/{name}/download", get(api::download_theme))
            .route("/uploads/{category}", post(api::upload))
            .route("/uploads/{category}/{*path}", delete(api::delete))
            .layer(DefaultBodyLimit::disable())
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }
}

pub mod prelude {
    pub use crate::StowageServer;
    pub use crate::state::*;
}
