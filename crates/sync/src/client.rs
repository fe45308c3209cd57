use std::path::{Path, PathBuf};

use filemirror_protocol::{Ack, FileList, Response};
use filemirror_transfer::{FileClient, is_plain_name};

use crate::SyncError;
use crate::mirror::prime_mirror;
use crate::remote::{Remote, RemoteFuture};

/// [`FileClient`] paired with the local mirror directory.
///
/// Explicit commands keep the mirror in step with the server: uploads
/// prime it, deletes and renames apply to it before going remote.
#[derive(Debug, Clone)]
pub struct SyncClient {
    client: FileClient,
    mirror: PathBuf,
}

impl SyncClient {
    pub fn new(client: FileClient, mirror: impl Into<PathBuf>) -> Self {
        Self {
            client,
            mirror: mirror.into(),
        }
    }

    pub fn client(&self) -> &FileClient {
        &self.client
    }

    pub fn mirror(&self) -> &Path {
        &self.mirror
    }

    /// Primes the mirror with `local_path` and uploads it as `name`.
    pub async fn upload(&self, local_path: &Path, name: &str) -> Result<Ack, SyncError> {
        prime_mirror(local_path, &self.mirror, name).await?;
        Ok(self.client.upload(local_path, name).await?)
    }

    /// Downloads `name` into the mirror directory.
    pub async fn download(&self, name: &str) -> Result<PathBuf, SyncError> {
        self.download_to(name, &self.mirror).await
    }

    /// Downloads `name` into `dir`.
    pub async fn download_to(&self, name: &str, dir: &Path) -> Result<PathBuf, SyncError> {
        Ok(self.client.download(name, dir).await?)
    }

    /// Removes the mirror copy of `name`, then deletes it remotely.
    ///
    /// A missing mirror copy is not an error.
    pub async fn delete(&self, name: &str) -> Result<Response, SyncError> {
        let local = self.mirror_path(name)?;
        match tokio::fs::remove_file(&local).await {
            Ok(()) => tracing::info!(path = %local.display(), "removed mirror copy"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %local.display(), "no mirror copy to remove");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(self.client.delete(name).await?)
    }

    /// Renames the mirror copy of `old_name` if there is one, then renames
    /// the remote file.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<Response, SyncError> {
        let old_local = self.mirror_path(old_name)?;
        let new_local = self.mirror_path(new_name)?;
        if tokio::fs::try_exists(&old_local).await? {
            tokio::fs::rename(&old_local, &new_local).await?;
            tracing::info!(
                from = %old_local.display(),
                to = %new_local.display(),
                "renamed mirror copy"
            );
        }
        Ok(self.client.rename(old_name, new_name).await?)
    }

    pub async fn list(&self) -> Result<FileList, SyncError> {
        Ok(self.client.list().await?)
    }

    fn mirror_path(&self, name: &str) -> Result<PathBuf, SyncError> {
        if !is_plain_name(name) {
            return Err(SyncError::InvalidName(name.to_string()));
        }
        Ok(self.mirror.join(name))
    }
}

impl Remote for SyncClient {
    fn upload<'a>(&'a self, path: &'a Path, name: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            SyncClient::upload(self, path, name).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, name: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.client.delete(name).await?;
            Ok(())
        })
    }

    fn rename<'a>(&'a self, old_name: &'a str, new_name: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            self.client.rename(old_name, new_name).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filemirror_protocol::ErrorKind;

    fn offline(mirror: &Path) -> SyncClient {
        // Nothing listens on port 1; remote calls fail fast.
        SyncClient::new(FileClient::new("127.0.0.1:1"), mirror)
    }

    #[tokio::test]
    async fn delete_removes_mirror_copy_first() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("x.txt"), b"x").unwrap();

        let err = offline(tmp.path()).delete("x.txt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StreamFailure);
        assert!(!tmp.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn rename_moves_mirror_copy_first() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();

        let _ = offline(tmp.path()).rename("a.txt", "b.txt").await;
        assert!(!tmp.path().join("a.txt").exists());
        assert_eq!(std::fs::read(tmp.path().join("b.txt")).unwrap(), b"a");
    }

    #[tokio::test]
    async fn unsafe_names_never_touch_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mirror = tmp.path().join("mirror");
        std::fs::create_dir(&mirror).unwrap();
        std::fs::write(tmp.path().join("outside.txt"), b"keep").unwrap();

        let err = offline(&mirror).delete("../outside.txt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(tmp.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn upload_of_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = offline(tmp.path())
            .upload(&tmp.path().join("absent.txt"), "absent.txt")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
