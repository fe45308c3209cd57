use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use filemirror_file_store::FileStore;
use filemirror_protocol::{Ack, FileInfo, FileList, Frame, Reply, Request, Response, write_frame};
use filemirror_transfer::session;

use crate::CallError;

/// Remote file operations over a [`FileStore`].
pub struct TransferService {
    store: FileStore,
}

impl TransferService {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Serves `request`, reading the rest of the call from `reader` and
    /// answering on `writer`.
    ///
    /// On success everything the call produces has been written; closing
    /// the stream is left to the caller. On error nothing more is read and
    /// the caller reports the failure.
    pub async fn serve_call<R, W>(
        &self,
        request: Request,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<(), CallError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match request {
            Request::Upload => {
                let ack = self.upload(reader).await?;
                send_reply(writer, Reply::Ack(ack)).await
            }
            Request::Download(req) => self.download(&req.file_name, writer).await,
            Request::Delete(req) => {
                let resp = self.delete(&req.file_name).await?;
                send_reply(writer, Reply::Response(resp)).await
            }
            Request::Rename(req) => {
                let resp = self.rename(&req.old_name, &req.new_name).await?;
                send_reply(writer, Reply::Response(resp)).await
            }
            Request::List => {
                let list = self.list().await?;
                send_reply(writer, Reply::FileList(list)).await
            }
        }
    }

    /// Receives an upload stream into the store.
    ///
    /// The header is validated before any file is created. Once data is
    /// flowing, a broken stream leaves the partial file on disk.
    pub async fn upload<R>(&self, reader: &mut R) -> Result<Ack, CallError>
    where
        R: AsyncRead + Unpin,
    {
        let name = session::read_upload_header(reader).await?;
        self.store.path_of(&name)?;

        let _guard = self.store.lock(&name).await;
        let mut file = self.store.create(&name).await?;

        let received = session::receive_upload(reader, &mut file).await;
        if let Err(e) = file.flush().await {
            warn!(name, error = %e, "flushing upload failed");
        }
        let bytes = received?;

        info!(name, bytes, "upload stored");
        Ok(Ack { name, bytes })
    }

    /// Streams a stored file to `writer`.
    ///
    /// A missing file fails before anything is written.
    pub async fn download<W>(&self, name: &str, writer: &mut W) -> Result<(), CallError>
    where
        W: AsyncWrite + Unpin,
    {
        let file = self.store.open_read(name).await?;
        let bytes = session::send_download(file, writer).await?;
        info!(name, bytes, "download sent");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<Response, CallError> {
        self.store.delete(name).await?;
        Ok(Response {
            message: format!("File {name} deleted successfully"),
        })
    }

    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<Response, CallError> {
        self.store.rename(old_name, new_name).await?;
        Ok(Response {
            message: format!("File {old_name} renamed to {new_name}"),
        })
    }

    pub async fn list(&self) -> Result<FileList, CallError> {
        let files = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|f| FileInfo {
                file_name: f.name,
                modification_time: f.modified,
            })
            .collect::<Vec<_>>();
        debug!(count = files.len(), "listed store");
        Ok(FileList { files })
    }
}

async fn send_reply<W>(writer: &mut W, reply: Reply) -> Result<(), CallError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &Frame::Reply(reply)).await?;
    writer.flush().await.map_err(filemirror_protocol::WireError::from)?;
    Ok(())
}
