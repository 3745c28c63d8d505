pub use stowage_core::*;

#[cfg(feature = "server")]
pub mod server {
    pub use stowage_server::*;
}

#[cfg(feature = "fs")]
pub mod fs {
    pub use stowage_fs::*;
}

pub mod prelude {
    pub use stowage_core::prelude::*;

    #[cfg(feature = "server")]
    pub use stowage_server::prelude::*;

    #[cfg(feature = "fs")]
    pub use stowage_fs::{LocalFileStore, ONE_YEAR_SECS};
}
