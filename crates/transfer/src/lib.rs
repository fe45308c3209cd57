//! Chunked file transfer over a single call.
//!
//! Uploads stream client → server as one header followed by data chunks;
//! downloads stream server → client as data chunks only. Either way the
//! sender closing its write half is what marks the transfer complete.
//!
//! [`FileClient`] drives the client half of every call. The server half
//! lives in [`session`] and is bound to storage by the service crate.

mod chunked;
mod client;
pub mod session;

pub use chunked::{ChunkReader, receive_chunks, send_chunks};
pub use client::{FileClient, is_plain_name};

use filemirror_protocol::{ErrorKind, Status, WireError};

/// Errors produced by the transfer engine.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream error: {0}")]
    Stream(#[from] WireError),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("server error: {0}")]
    Remote(Status),
}

impl TransferError {
    /// Category of this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::NotFound(_) => ErrorKind::NotFound,
            TransferError::Io(e) => ErrorKind::from_io(e),
            TransferError::Stream(e) => e.kind(),
            TransferError::Protocol(_) => ErrorKind::StreamFailure,
            TransferError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TransferError::Remote(status) => status.kind,
        }
    }
}
