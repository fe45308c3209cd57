use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use filemirror_protocol::{CHUNK_SIZE, Frame, data_chunk, read_frame, write_frame};

use crate::TransferError;

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source sequentially in fixed-size windows.
///
/// Every chunk except the last is exactly `chunk_size` bytes, regardless
/// of how the underlying reader splits its reads.
pub struct ChunkReader<R> {
    source: R,
    chunk_size: usize,
    offset: u64,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps `source`.
    ///
    /// If `chunk_size` is 0, [`CHUNK_SIZE`] is used.
    pub fn new(source: R, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            source,
            chunk_size,
            offset: 0,
        }
    }

    /// Reads the next window. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        self.offset += filled as u64;
        Ok(Some(buf))
    }

    /// Bytes read so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

// ---------------------------------------------------------------------------
// Stream halves
// ---------------------------------------------------------------------------

/// Sends every chunk of `reader` as a data frame, in source order.
///
/// Returns the number of payload bytes sent. Does not close the stream.
pub async fn send_chunks<R, W>(
    reader: &mut ChunkReader<R>,
    writer: &mut W,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = reader.next_chunk().await? {
        write_frame(writer, &data_chunk(chunk)).await?;
    }
    writer.flush().await?;
    Ok(reader.offset())
}

/// Appends data frames from `reader` to `sink` until the peer closes the
/// stream.
///
/// `pending` is a frame the caller already read off the stream and wants
/// handled first. A status frame aborts with [`TransferError::Remote`];
/// any other non-data frame is a protocol violation. Returns the number of
/// bytes written.
pub async fn receive_chunks<R, W>(
    reader: &mut R,
    sink: &mut W,
    mut pending: Option<Frame>,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut total: u64 = 0;
    loop {
        let frame = match pending.take() {
            Some(f) => f,
            None => match read_frame(reader).await? {
                Some(f) => f,
                None => break,
            },
        };

        match frame {
            Frame::Data(data) => {
                sink.write_all(&data).await?;
                total += data.len() as u64;
            }
            Frame::Status(status) => return Err(TransferError::Remote(status)),
            Frame::Header(h) => {
                return Err(TransferError::InvalidArgument(format!(
                    "second upload header ({}) in chunk stream",
                    h.name
                )));
            }
            other => {
                return Err(TransferError::Protocol(format!(
                    "unexpected {:?} frame in chunk stream",
                    other.kind()
                )));
            }
        }
    }
    sink.flush().await?;
    Ok(total)
}
