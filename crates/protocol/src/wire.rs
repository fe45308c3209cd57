//! Frame format for a single call.
//!
//! # Wire format
//!
//! ```text
//! FRAME:
//!   [1 byte: kind]
//!   [4 bytes BE: body_len]
//!   [body_len bytes: body]
//!
//! KINDS:
//!   0x01 REQUEST  JSON Request       (client -> server, first frame)
//!   0x02 HEADER   JSON UploadHeader  (client -> server, upload only)
//!   0x03 DATA     raw chunk bytes    (either direction)
//!   0x04 REPLY    JSON Reply         (server -> client)
//!   0x05 STATUS   JSON Status        (server -> client, on failure)
//!
//! END OF STREAM: the sender shuts down its write half. A close that
//! lands exactly on a frame boundary reads as `None`; a close inside a
//! frame is a truncation error.
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ErrorKind, Status};
use crate::messages::{Reply, Request, UploadHeader};

/// Largest accepted body for a JSON frame.
///
/// Data frames are not bounded: the receiver takes whatever chunk size the
/// sender chose.
pub const MAX_CONTROL_FRAME_LEN: usize = 64 * 1024;

/// Frame kind byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Request = 0x01,
    Header = 0x02,
    Data = 0x03,
    Reply = 0x04,
    Status = 0x05,
}

impl TryFrom<u8> for FrameKind {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(FrameKind::Request),
            0x02 => Ok(FrameKind::Header),
            0x03 => Ok(FrameKind::Data),
            0x04 => Ok(FrameKind::Reply),
            0x05 => Ok(FrameKind::Status),
            other => Err(WireError::UnknownKind(other)),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Request(Request),
    Header(UploadHeader),
    Data(Vec<u8>),
    Reply(Reply),
    Status(Status),
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Request(_) => FrameKind::Request,
            Frame::Header(_) => FrameKind::Header,
            Frame::Data(_) => FrameKind::Data,
            Frame::Reply(_) => FrameKind::Reply,
            Frame::Status(_) => FrameKind::Status,
        }
    }
}

/// Errors produced while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid frame body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown frame kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("stream closed inside a frame")]
    Truncated,

    #[error("frame body too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },
}

impl WireError {
    /// Every framing failure is a transport failure.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StreamFailure
    }
}

/// Maps an EOF inside a frame to [`WireError::Truncated`].
fn truncated(e: std::io::Error) -> WireError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        WireError::Truncated
    } else {
        WireError::Io(e)
    }
}

/// Writes one frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), WireError> {
    let json;
    let body: &[u8] = match frame {
        Frame::Data(data) => data,
        Frame::Request(req) => {
            json = serde_json::to_vec(req)?;
            &json
        }
        Frame::Header(header) => {
            json = serde_json::to_vec(header)?;
            &json
        }
        Frame::Reply(reply) => {
            json = serde_json::to_vec(reply)?;
            &json
        }
        Frame::Status(status) => {
            json = serde_json::to_vec(status)?;
            &json
        }
    };

    let len = u32::try_from(body.len()).map_err(|_| WireError::FrameTooLarge {
        len: body.len(),
        max: u32::MAX as usize,
    })?;

    writer.write_u8(frame.kind() as u8).await?;
    writer.write_u32(len).await?;
    writer.write_all(body).await?;
    Ok(())
}

/// Reads one frame.
///
/// Returns `None` if the peer closed the stream on a frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Frame>, WireError> {
    let mut kind_byte = [0u8; 1];
    if reader.read(&mut kind_byte).await? == 0 {
        return Ok(None);
    }
    let kind = FrameKind::try_from(kind_byte[0])?;

    let len = reader.read_u32().await.map_err(truncated)? as usize;
    if kind != FrameKind::Data && len > MAX_CONTROL_FRAME_LEN {
        return Err(WireError::FrameTooLarge {
            len,
            max: MAX_CONTROL_FRAME_LEN,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(truncated)?;

    let frame = match kind {
        FrameKind::Data => Frame::Data(body),
        FrameKind::Request => Frame::Request(serde_json::from_slice(&body)?),
        FrameKind::Header => Frame::Header(serde_json::from_slice(&body)?),
        FrameKind::Reply => Frame::Reply(serde_json::from_slice(&body)?),
        FrameKind::Status => Frame::Status(serde_json::from_slice(&body)?),
    };
    Ok(Some(frame))
}
