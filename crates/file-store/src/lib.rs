//! Server-side file store.
//!
//! Every operation is scoped to a single root directory and addresses
//! files by bare name. The filesystem namespace is the only source of
//! identity; the store adds a per-name lock so writers to the same name
//! take turns instead of interleaving.

mod locks;
mod store;
mod validation;

pub use locks::{NameGuard, NameLocks};
pub use store::{FileStore, StoredFile};
pub use validation::validate_file_name;

/// Default root directory for stored files.
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Errors produced by the file store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file {0} not found")]
    NotFound(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Converts an I/O error on `name`, keeping "not found" distinct.
    pub(crate) fn from_io(name: &str, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(name.to_string())
        } else {
            StoreError::Io(err)
        }
    }
}
