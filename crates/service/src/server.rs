//! TCP call listener.
//!
//! Every accepted connection carries exactly one call and is served on
//! its own task, inside a span tagged with a fresh call id.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use filemirror_protocol::{Frame, Status, write_frame};
use filemirror_transfer::session;

use crate::ServerError;
use crate::service::TransferService;

const READ_BUFFER_SIZE: usize = 64 * 1024;
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// How long a failed call keeps discarding client input before the socket
/// is dropped anyway.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Accepts calls and hands them to a [`TransferService`].
pub struct Server {
    listen: String,
    service: Arc<TransferService>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Server {
    /// `listen` is a bind address such as `"0.0.0.0:50051"`; port 0 picks
    /// a free port.
    pub fn new(listen: impl Into<String>, service: TransferService) -> Arc<Self> {
        Arc::new(Self {
            listen: listen.into(),
            service: Arc::new(service),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the bound address. Only available after [`bind`](Self::bind).
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Stops accepting new calls. Calls already running finish on their own.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the listen address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let mut slot = self.local_addr.lock().await;
        if slot.is_some() {
            return Err(ServerError::AlreadyBound);
        }
        let listener = TcpListener::bind(&self.listen).await?;
        let local_addr = listener.local_addr()?;
        *slot = Some(local_addr);
        tracing::info!("filemirror server listening on {local_addr}");
        Ok(listener)
    }

    /// Binds and serves until [`shutdown`](Self::shutdown).
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serves calls from an already bound listener until shutdown.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream, peer_addr).await {
                                    tracing::error!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), ServerError> {
        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, reader);
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, writer);

        let request = match session::read_request(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::debug!(%peer_addr, "connection closed without a call");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(%peer_addr, "malformed call: {e}");
                abort(&mut reader, &mut writer, Status::new(e.kind(), e.to_string())).await;
                return Ok(());
            }
        };

        let span = tracing::info_span!(
            "call",
            call_id = %Uuid::new_v4(),
            method = request.method(),
            peer = %peer_addr,
        );

        async move {
            tracing::info!("call started");
            match self
                .service
                .serve_call(request, &mut reader, &mut writer)
                .await
            {
                Ok(()) => {
                    writer.shutdown().await?;
                    tracing::info!("call completed");
                }
                Err(e) => {
                    tracing::warn!(kind = %e.kind(), "call failed: {e}");
                    abort(&mut reader, &mut writer, e.to_status()).await;
                }
            }
            Ok::<(), ServerError>(())
        }
        .instrument(span)
        .await
    }
}

/// Reports `status`, closes the write side and discards whatever the client
/// still sends, so the close does not reset the connection under it.
async fn abort<R, W>(reader: &mut R, writer: &mut W, status: Status)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Err(e) = write_frame(writer, &Frame::Status(status)).await {
        tracing::debug!("could not send status: {e}");
        return;
    }
    if let Err(e) = writer.shutdown().await {
        tracing::debug!("could not close stream: {e}");
        return;
    }
    let drained =
        tokio::time::timeout(DRAIN_TIMEOUT, tokio::io::copy(reader, &mut tokio::io::sink())).await;
    if let Ok(Ok(n)) = drained
        && n > 0
    {
        tracing::debug!(bytes = n, "discarded rest of failed call");
    }
}
