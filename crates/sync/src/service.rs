//! Owned watcher + dispatch task.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::SyncError;
use crate::engine::SyncEngine;
use crate::event::classify;
use crate::remote::Remote;

/// Lifecycle of a [`SyncService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Watching,
    Stopped,
}

/// Watches one directory (non-recursively) and mirrors its changes.
///
/// Events are handled in arrival order by a single task. A watcher error
/// stops the service; it is not restarted.
pub struct SyncService<R: Remote> {
    dir: PathBuf,
    remote: Option<R>,
    cancel: CancellationToken,
    state: watch::Sender<SyncState>,
    task: Option<JoinHandle<()>>,
}

impl<R: Remote> SyncService<R> {
    pub fn new(dir: impl Into<PathBuf>, remote: R) -> Self {
        Self::with_cancel(dir, remote, CancellationToken::new())
    }

    /// Like [`new`](Self::new), stopping when `cancel` fires.
    pub fn with_cancel(dir: impl Into<PathBuf>, remote: R, cancel: CancellationToken) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            dir: dir.into(),
            remote: Some(remote),
            cancel,
            state,
            task: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Receiver that sees every state change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Registers the watcher and spawns the dispatch task.
    ///
    /// Must be called from within a tokio runtime. Only an idle service
    /// can start.
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.state() != SyncState::Idle || self.remote.is_none() {
            return Err(SyncError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        let Some(remote) = self.remote.take() else {
            return Err(SyncError::AlreadyStarted);
        };

        self.state.send_replace(SyncState::Watching);
        info!(dir = %self.dir.display(), "watching directory");

        let engine = SyncEngine::new(remote);
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        self.task = Some(tokio::spawn(dispatch(watcher, rx, engine, cancel, state)));
        Ok(())
    }

    /// Stops watching and waits for the event being handled to finish.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!("sync task ended abnormally: {e}");
        }
        self.state.send_replace(SyncState::Stopped);
    }
}

impl<R: Remote> Drop for SyncService<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn dispatch<R: Remote>(
    watcher: RecommendedWatcher,
    mut events: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    mut engine: SyncEngine<R>,
    cancel: CancellationToken,
    state: watch::Sender<SyncState>,
) {
    // Dropping the watcher unregisters it.
    let _watcher = watcher;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = events.recv() => next,
        };

        match next {
            Some(Ok(event)) => {
                for watch_event in classify(event) {
                    let path = watch_event.path.clone();
                    if let Err(e) = engine.handle(watch_event).await {
                        error!(path = %path.display(), kind = %e.kind(), "sync failed: {e}");
                    }
                }
            }
            Some(Err(e)) => {
                error!("watcher error: {e}");
                break;
            }
            None => {
                warn!("watcher channel closed");
                break;
            }
        }
    }

    state.send_replace(SyncState::Stopped);
    debug!("sync dispatch stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::remote::RemoteFuture;

    #[derive(Clone, Default)]
    struct Uploads(Arc<Mutex<Vec<String>>>);

    impl Remote for Uploads {
        fn upload<'a>(&'a self, _: &'a Path, name: &'a str) -> RemoteFuture<'a, ()> {
            Box::pin(async move {
                self.0.lock().unwrap().push(name.to_string());
                Ok(())
            })
        }
        fn delete<'a>(&'a self, _: &'a str) -> RemoteFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }
        fn rename<'a>(&'a self, _: &'a str, _: &'a str) -> RemoteFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn lifecycle_idle_watching_stopped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut svc = SyncService::new(tmp.path(), Uploads::default());
        assert_eq!(svc.state(), SyncState::Idle);

        svc.start().unwrap();
        assert_eq!(svc.state(), SyncState::Watching);
        assert!(matches!(svc.start(), Err(SyncError::AlreadyStarted)));

        svc.stop().await;
        assert_eq!(svc.state(), SyncState::Stopped);
    }

    #[tokio::test]
    async fn missing_directory_fails_to_start() {
        let tmp = tempfile::tempdir().unwrap();
        let mut svc = SyncService::new(tmp.path().join("absent"), Uploads::default());
        assert!(svc.start().is_err());
        assert_eq!(svc.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn cancel_token_stops_dispatch() {
        let tmp = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let mut svc = SyncService::with_cancel(tmp.path(), Uploads::default(), cancel.clone());
        let mut states = svc.subscribe();
        svc.start().unwrap();

        cancel.cancel();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            states.wait_for(|s| *s == SyncState::Stopped),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn created_file_is_uploaded() {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = Uploads::default();
        let mut svc = SyncService::new(tmp.path(), uploads.clone());
        svc.start().unwrap();

        std::fs::write(tmp.path().join("seen.txt"), b"hi").unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
        while !uploads.0.lock().unwrap().iter().any(|n| n == "seen.txt") {
            assert!(
                tokio::time::Instant::now() < deadline,
                "upload never happened"
            );
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        svc.stop().await;
    }
}
