//! Client-side mirroring.
//!
//! A [`SyncService`] watches one directory and replays every change on a
//! [`Remote`] through the [`SyncEngine`]. [`SyncClient`] is the remote
//! used in practice: it wraps a [`FileClient`] and keeps the local mirror
//! directory in step with explicit commands.
//!
//! [`FileClient`]: filemirror_transfer::FileClient

mod client;
mod engine;
mod event;
mod mirror;
mod remote;
mod service;

pub use client::SyncClient;
pub use engine::{SyncAction, SyncEngine};
pub use event::{WatchEvent, WatchKind, classify};
pub use mirror::prime_mirror;
pub use remote::{Remote, RemoteFuture};
pub use service::{SyncService, SyncState};

use std::path::PathBuf;

use filemirror_protocol::ErrorKind;
use filemirror_transfer::TransferError;

/// Default local mirror directory.
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Errors produced while mirroring.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("sync service already started")]
    AlreadyStarted,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Transfer(e) => e.kind(),
            SyncError::Io(e) => ErrorKind::from_io(e),
            SyncError::Watch(_) => ErrorKind::IoFailure,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::InvalidName(_) | SyncError::AlreadyStarted => ErrorKind::InvalidArgument,
        }
    }
}
