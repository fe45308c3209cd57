use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::SyncError;

/// A boxed future returned by [`Remote`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send + 'a>>;

/// Remote operations the sync engine replays local changes onto.
pub trait Remote: Send + Sync + 'static {
    /// Pushes the local file at `path` under `name`.
    fn upload<'a>(&'a self, path: &'a Path, name: &'a str) -> RemoteFuture<'a, ()>;

    fn delete<'a>(&'a self, name: &'a str) -> RemoteFuture<'a, ()>;

    fn rename<'a>(&'a self, old_name: &'a str, new_name: &'a str) -> RemoteFuture<'a, ()>;
}
