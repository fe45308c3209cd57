use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tokio::fs::{File, OpenOptions};
use tokio::sync::Mutex;

use crate::locks::{NameGuard, NameLocks};
use crate::validation::validate_file_name;
use crate::StoreError;

/// A stored file as reported by [`FileStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    /// Last modification time in unix seconds.
    pub modified: i64,
}

/// Files under a single root directory.
pub struct FileStore {
    root: PathBuf,
    locks: NameLocks,
    /// Coarse lock held only while enumerating the root.
    list_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store over an existing root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: NameLocks::new(),
            list_lock: Mutex::new(()),
        }
    }

    /// Creates the root directory if needed and returns a store over it.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "file store ready");
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` under the root after validating it.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_file_name(name)?;
        Ok(self.root.join(name))
    }

    /// Locks `name` against other writers.
    ///
    /// Uploads hold this guard for the whole session; [`delete`](Self::delete)
    /// and [`rename`](Self::rename) take it internally.
    pub async fn lock(&self, name: &str) -> NameGuard {
        self.locks.acquire(name).await
    }

    /// Opens `name` for writing, truncating any existing content.
    ///
    /// An existing file is overwritten silently. The caller is expected to
    /// hold [`lock`](Self::lock) for `name` while writing.
    pub async fn create(&self, name: &str) -> Result<File, StoreError> {
        let path = self.path_of(name)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        tracing::debug!(path = %path.display(), "opened for write");
        Ok(file)
    }

    /// Opens `name` for reading.
    pub async fn open_read(&self, name: &str) -> Result<File, StoreError> {
        let path = self.path_of(name)?;
        File::open(&path)
            .await
            .map_err(|e| StoreError::from_io(name, e))
    }

    /// Removes `name`. Removing a missing file is an error, not a no-op.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        let _guard = self.lock(name).await;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StoreError::from_io(name, e))?;
        tracing::info!(name, "deleted file");
        Ok(())
    }

    /// Renames `old_name` to `new_name`, replacing `new_name` if it exists.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<(), StoreError> {
        let old_path = self.path_of(old_name)?;
        let new_path = self.path_of(new_name)?;
        let _guards = self.locks.acquire_pair(old_name, new_name).await;

        // A missing source must report the source name, not whichever
        // path the OS complains about.
        if !tokio::fs::try_exists(&old_path).await? {
            return Err(StoreError::NotFound(old_name.to_string()));
        }
        tokio::fs::rename(&old_path, &new_path)
            .await
            .map_err(|e| StoreError::from_io(old_name, e))?;
        tracing::info!(old_name, new_name, "renamed file");
        Ok(())
    }

    /// Lists every entry under the root with its modification time.
    ///
    /// Order is whatever the directory enumeration yields.
    pub async fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let _guard = self.list_lock.lock().await;

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    // Removed between enumeration and stat.
                    tracing::warn!(name, error = %e, "skipping entry");
                    continue;
                }
            };
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            files.push(StoredFile { name, modified });
        }
        Ok(files)
    }
}
