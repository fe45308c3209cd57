//! Chunk codec: the unit of a transfer stream.
//!
//! There is no compression, checksum or sequence number. Order on the
//! wire is the only ordering a receiver relies on, and a chunk's payload
//! is exactly the bytes the sender read.

use crate::messages::UploadHeader;
use crate::wire::Frame;

/// Maximum payload a sender puts into one data chunk.
pub const CHUNK_SIZE: usize = 1024;

/// Encodes the name-bearing chunk that opens an upload stream.
pub fn name_chunk(name: impl Into<String>) -> Frame {
    Frame::Header(UploadHeader { name: name.into() })
}

/// Encodes a data chunk.
pub fn data_chunk(bytes: impl Into<Vec<u8>>) -> Frame {
    Frame::Data(bytes.into())
}
