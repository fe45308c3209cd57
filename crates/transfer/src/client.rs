//! Client half of every call.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, info, warn};

use filemirror_protocol::{
    Ack, CHUNK_SIZE, FileList, FileRequest, Frame, RenameRequest, Reply, Request, Response,
    data_chunk, name_chunk, read_frame, write_frame,
};

use crate::TransferError;
use crate::chunked::{ChunkReader, receive_chunks};

/// Outcome of writing an upload stream.
enum Sent {
    Done(u64),
    /// Reading the local source failed; nothing more was written.
    SourceFailed(std::io::Error),
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Issues calls against a filemirror server.
///
/// Each call opens its own connection; a `FileClient` is cheap to clone
/// and safe to share between tasks.
#[derive(Debug, Clone)]
pub struct FileClient {
    addr: String,
}

impl FileClient {
    /// `addr` is anything [`TcpStream::connect`] resolves, such as
    /// `"127.0.0.1:50051"` or `"localhost:50051"`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn connect(&self) -> Result<(OwnedReadHalf, BufWriter<OwnedWriteHalf>), TransferError> {
        let stream = match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(TransferError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connecting to {} timed out", self.addr),
                )));
            }
        };
        debug!(addr = %self.addr, "connected");

        let (reader, writer) = stream.into_split();
        Ok((reader, BufWriter::with_capacity(WRITE_BUFFER_SIZE, writer)))
    }

    /// Sends `request` with nothing after it and reads the single reply.
    async fn call(&self, request: Request) -> Result<Reply, TransferError> {
        let (mut reader, mut writer) = self.connect().await?;
        write_frame(&mut writer, &Frame::Request(request)).await?;
        writer.shutdown().await?;
        read_reply(&mut reader).await
    }

    /// Uploads `local_path` to the remote file `remote_name`.
    ///
    /// A missing local file fails with [`TransferError::NotFound`], and a
    /// directory with [`TransferError::InvalidArgument`], without contacting
    /// the server. An existing remote file is overwritten.
    pub async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<Ack, TransferError> {
        let file = match tokio::fs::File::open(local_path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::NotFound(local_path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if file.metadata().await?.is_dir() {
            return Err(TransferError::InvalidArgument(format!(
                "{} is a directory",
                local_path.display()
            )));
        }

        let ack = self.upload_from(file, remote_name).await?;
        info!(
            path = %local_path.display(),
            name = %ack.name,
            bytes = ack.bytes,
            "uploaded"
        );
        Ok(ack)
    }

    /// Streams `source` to the remote file `remote_name`.
    ///
    /// A failed read of `source` drops the connection without flushing and
    /// returns the local error. The server keeps whatever already arrived.
    async fn upload_from<S>(&self, source: S, remote_name: &str) -> Result<Ack, TransferError>
    where
        S: AsyncRead + Unpin,
    {
        let (mut reader, mut writer) = self.connect().await?;
        let mut chunks = ChunkReader::new(source, CHUNK_SIZE);

        let sent = async {
            write_frame(&mut writer, &Frame::Request(Request::Upload)).await?;
            write_frame(&mut writer, &name_chunk(remote_name)).await?;
            loop {
                let chunk = match chunks.next_chunk().await {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(e) => return Ok(Sent::SourceFailed(e)),
                };
                write_frame(&mut writer, &data_chunk(chunk)).await?;
            }
            writer.shutdown().await?;
            Ok::<Sent, TransferError>(Sent::Done(chunks.offset()))
        }
        .await;

        match sent {
            Ok(Sent::Done(bytes)) => debug!(name = remote_name, bytes, "upload stream sent"),
            Ok(Sent::SourceFailed(e)) => {
                warn!(
                    name = remote_name,
                    sent = chunks.offset(),
                    "reading upload source failed: {e}"
                );
                drop(writer);
                return Err(TransferError::Io(e));
            }
            Err(e) => {
                // The server may have rejected the stream and hung up; its
                // status explains the broken write better than the write does.
                if let Ok(Some(Frame::Status(status))) = read_frame(&mut reader).await {
                    return Err(TransferError::Remote(status));
                }
                return Err(e);
            }
        }

        match read_reply(&mut reader).await? {
            Reply::Ack(ack) => Ok(ack),
            other => Err(unexpected_reply("upload", &other)),
        }
    }

    /// Downloads the remote file `name` into `dest_dir/name`.
    ///
    /// The local file is created only once the server has started to
    /// answer with data (or closed cleanly, for an empty file), so a
    /// failed download leaves nothing behind. Returns the local path.
    pub async fn download(&self, name: &str, dest_dir: &Path) -> Result<PathBuf, TransferError> {
        if !is_plain_name(name) {
            return Err(TransferError::InvalidArgument(format!(
                "not a plain file name: {name}"
            )));
        }

        let (mut reader, mut writer) = self.connect().await?;
        let request = Request::Download(FileRequest {
            file_name: name.to_string(),
        });
        write_frame(&mut writer, &Frame::Request(request)).await?;
        writer.shutdown().await?;

        let first = match read_frame(&mut reader).await? {
            Some(Frame::Status(status)) => return Err(TransferError::Remote(status)),
            Some(frame @ Frame::Data(_)) => Some(frame),
            None => None,
            Some(other) => {
                return Err(TransferError::Protocol(format!(
                    "unexpected {:?} frame in download",
                    other.kind()
                )));
            }
        };

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(name);
        let mut file = tokio::fs::File::create(&path).await?;

        let bytes = match first {
            Some(frame) => receive_chunks(&mut reader, &mut file, Some(frame)).await?,
            None => 0,
        };
        file.flush().await?;

        info!(name, path = %path.display(), bytes, "downloaded");
        Ok(path)
    }

    /// Deletes the remote file `name`.
    pub async fn delete(&self, name: &str) -> Result<Response, TransferError> {
        let request = Request::Delete(FileRequest {
            file_name: name.to_string(),
        });
        match self.call(request).await? {
            Reply::Response(resp) => Ok(resp),
            other => Err(unexpected_reply("delete", &other)),
        }
    }

    /// Renames the remote file `old_name` to `new_name`.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<Response, TransferError> {
        let request = Request::Rename(RenameRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        match self.call(request).await? {
            Reply::Response(resp) => Ok(resp),
            other => Err(unexpected_reply("rename", &other)),
        }
    }

    /// Lists the remote store.
    pub async fn list(&self) -> Result<FileList, TransferError> {
        match self.call(Request::List).await? {
            Reply::FileList(list) => Ok(list),
            other => Err(unexpected_reply("list", &other)),
        }
    }
}

async fn read_reply(reader: &mut OwnedReadHalf) -> Result<Reply, TransferError> {
    match read_frame(reader).await? {
        Some(Frame::Reply(reply)) => Ok(reply),
        Some(Frame::Status(status)) => Err(TransferError::Remote(status)),
        Some(other) => Err(TransferError::Protocol(format!(
            "expected reply, got {:?} frame",
            other.kind()
        ))),
        None => Err(TransferError::Protocol(
            "connection closed before reply".into(),
        )),
    }
}

fn unexpected_reply(method: &str, reply: &Reply) -> TransferError {
    TransferError::Protocol(format!("unexpected reply to {method}: {reply:?}"))
}

/// Returns `true` if `name` is a single plain path component, safe to
/// join onto a local directory.
pub fn is_plain_name(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
