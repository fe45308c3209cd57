//! Server side of filemirror.
//!
//! [`Server`] accepts TCP connections and runs one call per connection;
//! [`TransferService`] binds each call to the [`FileStore`]. Failures are
//! turned into a [`Status`] frame at this boundary.
//!
//! [`FileStore`]: filemirror_file_store::FileStore
//! [`Status`]: filemirror_protocol::Status

mod server;
mod service;

pub use server::Server;
pub use service::TransferService;

use filemirror_file_store::StoreError;
use filemirror_protocol::{ErrorKind, Status, WireError};
use filemirror_transfer::TransferError;

/// Errors produced by the call listener itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server already bound")]
    AlreadyBound,
}

/// Why a single call failed.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            CallError::Store(StoreError::InvalidName(_)) => ErrorKind::InvalidArgument,
            CallError::Store(StoreError::Io(_)) => ErrorKind::IoFailure,
            CallError::Transfer(e) => e.kind(),
            CallError::Wire(e) => e.kind(),
        }
    }

    /// Status frame body reported to the client.
    pub fn to_status(&self) -> Status {
        Status::new(self.kind(), self.to_string())
    }
}
