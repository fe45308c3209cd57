//! Watched directory mirrored onto a live server.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filemirror_file_store::FileStore;
use filemirror_service::{Server, TransferService};
use filemirror_sync::{Remote, RemoteFuture, SyncClient, SyncService, SyncState};
use filemirror_transfer::FileClient;

const WAIT: Duration = Duration::from_secs(10);

/// Forwards to a [`SyncClient`] and remembers every rename it was asked for.
#[derive(Clone)]
struct RecordingRemote {
    inner: SyncClient,
    renames: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingRemote {
    fn new(inner: SyncClient) -> Self {
        Self {
            inner,
            renames: Arc::default(),
        }
    }

    fn renames(&self) -> Vec<(String, String)> {
        self.renames.lock().unwrap().clone()
    }
}

impl Remote for RecordingRemote {
    fn upload<'a>(&'a self, path: &'a Path, name: &'a str) -> RemoteFuture<'a, ()> {
        Remote::upload(&self.inner, path, name)
    }

    fn delete<'a>(&'a self, name: &'a str) -> RemoteFuture<'a, ()> {
        Remote::delete(&self.inner, name)
    }

    fn rename<'a>(&'a self, old_name: &'a str, new_name: &'a str) -> RemoteFuture<'a, ()> {
        self.renames
            .lock()
            .unwrap()
            .push((old_name.to_string(), new_name.to_string()));
        Remote::rename(&self.inner, old_name, new_name)
    }
}

async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if check().await {
            return;
        }
        assert!(tokio::time::Instant::now() < deadline, "timed out: {what}");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn created_then_deleted_file_follows_server_side() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(tmp.path().join("uploads")).await.unwrap();
    let server = Server::new("127.0.0.1:0", TransferService::new(store));
    let listener = server.bind().await.unwrap();
    let addr = server.local_addr().await.unwrap();
    let s = Arc::clone(&server);
    tokio::spawn(async move { s.serve(listener).await.unwrap() });

    let downloads = tmp.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    let client = FileClient::new(addr.to_string());
    let mut sync = SyncService::new(&downloads, SyncClient::new(client.clone(), &downloads));
    sync.start().unwrap();
    assert_eq!(sync.state(), SyncState::Watching);

    std::fs::write(downloads.join("notes.txt"), b"hello").unwrap();
    eventually("notes.txt uploaded", || {
        let client = client.clone();
        async move {
            client
                .list()
                .await
                .map(|l| l.contains("notes.txt"))
                .unwrap_or(false)
        }
    })
    .await;

    let stored = tmp.path().join("uploads").join("notes.txt");
    eventually("notes.txt content synced", || {
        let stored = stored.clone();
        async move { std::fs::read(&stored).map(|c| c == b"hello").unwrap_or(false) }
    })
    .await;

    std::fs::remove_file(downloads.join("notes.txt")).unwrap();
    eventually("notes.txt deleted", || {
        let client = client.clone();
        async move {
            client
                .list()
                .await
                .map(|l| !l.contains("notes.txt"))
                .unwrap_or(false)
        }
    })
    .await;

    sync.stop().await;
    assert_eq!(sync.state(), SyncState::Stopped);
    server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn renamed_file_ends_up_under_new_name() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::open(tmp.path().join("uploads")).await.unwrap();
    let server = Server::new("127.0.0.1:0", TransferService::new(store));
    let listener = server.bind().await.unwrap();
    let addr = server.local_addr().await.unwrap();
    let s = Arc::clone(&server);
    tokio::spawn(async move { s.serve(listener).await.unwrap() });

    let downloads = tmp.path().join("downloads");
    std::fs::create_dir_all(&downloads).unwrap();
    let client = FileClient::new(addr.to_string());
    let remote = RecordingRemote::new(SyncClient::new(client.clone(), &downloads));
    let mut sync = SyncService::new(&downloads, remote.clone());
    sync.start().unwrap();

    std::fs::write(downloads.join("a.txt"), b"alpha").unwrap();
    eventually("a.txt uploaded", || {
        let client = client.clone();
        async move { client.list().await.map(|l| l.contains("a.txt")).unwrap_or(false) }
    })
    .await;

    std::fs::rename(downloads.join("a.txt"), downloads.join("b.txt")).unwrap();
    eventually("rename to b.txt issued", || {
        let remote = remote.clone();
        async move { remote.renames().iter().any(|(_, new)| new == "b.txt") }
    })
    .await;
    assert!(remote.renames().contains(&("a.txt".to_string(), "b.txt".to_string())));

    // inotify reports the source half first, so a.txt is usually already
    // deleted and the rename falls back to uploading b.txt.
    eventually("b.txt replaces a.txt", || {
        let client = client.clone();
        async move {
            client
                .list()
                .await
                .map(|l| l.contains("b.txt") && !l.contains("a.txt"))
                .unwrap_or(false)
        }
    })
    .await;

    let stored = tmp.path().join("uploads").join("b.txt");
    eventually("b.txt content synced", || {
        let stored = stored.clone();
        async move { std::fs::read(&stored).map(|c| c == b"alpha").unwrap_or(false) }
    })
    .await;

    sync.stop().await;
    server.shutdown();
}
