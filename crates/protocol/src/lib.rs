//! Wire protocol for filemirror client/server calls.
//!
//! Every call runs over its own TCP connection as a sequence of frames
//! (see [`wire`]). Uploads open with a typed [`UploadHeader`] and continue
//! with raw data chunks of at most [`CHUNK_SIZE`] bytes; downloads reply
//! with data chunks only. The end of a chunk stream is the sender closing
//! its write half, never an in-band marker.

pub mod chunk;
pub mod error;
pub mod messages;
pub mod wire;

pub use chunk::{CHUNK_SIZE, data_chunk, name_chunk};
pub use error::{ErrorKind, Status};
pub use messages::{
    Ack, FileInfo, FileList, FileRequest, RenameRequest, Reply, Request, Response, UploadHeader,
};
pub use wire::{Frame, FrameKind, WireError, read_frame, write_frame};

/// Default TCP port of the file server.
pub const DEFAULT_PORT: u16 = 50051;
