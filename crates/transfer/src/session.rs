//! Server half of a call.
//!
//! These functions only speak the stream; where bytes come from or go to
//! is the caller's business.

use tokio::io::{AsyncRead, AsyncWrite};

use filemirror_protocol::{CHUNK_SIZE, Frame, Request, read_frame};

use crate::TransferError;
use crate::chunked::{ChunkReader, receive_chunks, send_chunks};

/// Reads the request that opens a call.
///
/// Returns `None` if the peer closed without sending anything.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, TransferError>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader).await? {
        None => Ok(None),
        Some(Frame::Request(req)) => Ok(Some(req)),
        Some(other) => Err(TransferError::Protocol(format!(
            "call must open with a request, got {:?}",
            other.kind()
        ))),
    }
}

/// Reads the name-bearing chunk of an upload.
///
/// The header must be the first chunk. A stream that closes first or
/// opens with data is rejected before any file is created.
pub async fn read_upload_header<R>(reader: &mut R) -> Result<String, TransferError>
where
    R: AsyncRead + Unpin,
{
    match read_frame(reader).await? {
        Some(Frame::Header(header)) => Ok(header.name),
        Some(Frame::Data(_)) => Err(TransferError::InvalidArgument(
            "upload stream must open with a name chunk".into(),
        )),
        None => Err(TransferError::InvalidArgument(
            "upload stream closed before a name chunk".into(),
        )),
        Some(other) => Err(TransferError::Protocol(format!(
            "unexpected {:?} frame at start of upload",
            other.kind()
        ))),
    }
}

/// Writes every remaining data chunk of an upload to `sink`.
///
/// Completes when the client closes its side of the stream. On error the
/// sink keeps whatever was written so far.
pub async fn receive_upload<R, W>(reader: &mut R, sink: &mut W) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    receive_chunks(reader, sink, None).await
}

/// Streams `source` to the client as data chunks.
///
/// An empty source sends nothing; the caller closes the stream afterwards.
pub async fn send_download<S, W>(source: S, writer: &mut W) -> Result<u64, TransferError>
where
    S: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = ChunkReader::new(source, CHUNK_SIZE);
    send_chunks(&mut reader, writer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use filemirror_protocol::{ErrorKind, FileRequest, data_chunk, name_chunk, write_frame};

    async fn encode(frames: &[Frame]) -> Vec<u8> {
        let mut buf = Vec::new();
        for f in frames {
            write_frame(&mut buf, f).await.unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn request_is_read_first() {
        let req = Request::Download(FileRequest {
            file_name: "a.txt".into(),
        });
        let wire = encode(&[Frame::Request(req.clone())]).await;
        let got = read_request(&mut &wire[..]).await.unwrap();
        assert_eq!(got, Some(req));
    }

    #[tokio::test]
    async fn empty_call_has_no_request() {
        assert!(read_request(&mut &b""[..]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn call_opening_with_data_is_rejected() {
        let wire = encode(&[data_chunk(b"x".to_vec())]).await;
        let err = read_request(&mut &wire[..]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamFailure);
    }

    #[tokio::test]
    async fn upload_reads_header_then_data() {
        let wire = encode(&[
            name_chunk("notes.txt"),
            data_chunk(b"hello ".to_vec()),
            data_chunk(b"world".to_vec()),
        ])
        .await;
        let mut cursor = &wire[..];

        let name = read_upload_header(&mut cursor).await.unwrap();
        assert_eq!(name, "notes.txt");

        let mut out = Vec::new();
        let n = receive_upload(&mut cursor, &mut out).await.unwrap();
        assert_eq!(n, 11);
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn upload_without_header_is_invalid() {
        let wire = encode(&[data_chunk(b"orphan".to_vec())]).await;
        let err = read_upload_header(&mut &wire[..]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = read_upload_header(&mut &b""[..]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn header_only_upload_is_empty() {
        let wire = encode(&[name_chunk("empty.bin")]).await;
        let mut cursor = &wire[..];
        read_upload_header(&mut cursor).await.unwrap();

        let mut out = Vec::new();
        assert_eq!(receive_upload(&mut cursor, &mut out).await.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn download_of_empty_source_sends_nothing() {
        let mut wire = Vec::new();
        let n = send_download(&b""[..], &mut wire).await.unwrap();
        assert_eq!(n, 0);
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn download_chunks_in_order() {
        let data: Vec<u8> = (0..2048u32 + 10).map(|i| (i % 251) as u8).collect();
        let mut wire = Vec::new();
        send_download(&data[..], &mut wire).await.unwrap();

        let mut cursor = &wire[..];
        let mut sizes = Vec::new();
        let mut joined = Vec::new();
        while let Some(frame) = read_frame(&mut cursor).await.unwrap() {
            match frame {
                Frame::Data(d) => {
                    sizes.push(d.len());
                    joined.extend_from_slice(&d);
                }
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(sizes, vec![1024, 1024, 10]);
        assert_eq!(joined, data);
    }
}
