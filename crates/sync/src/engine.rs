//! Watch event → remote operation mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use filemirror_protocol::ErrorKind;

use crate::event::{WatchEvent, WatchKind};
use crate::remote::Remote;
use crate::SyncError;

/// Remote operation chosen for a watch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Upload { path: PathBuf, name: String },
    Delete { name: String },
    Rename {
        path: PathBuf,
        old_name: String,
        new_name: String,
    },
}

/// Replays watch events on a [`Remote`], one at a time.
///
/// Keeps a shadow map of local path → remote name so a rename can name
/// the file it replaces and a delete can name the file it removes.
pub struct SyncEngine<R> {
    remote: R,
    shadow: HashMap<PathBuf, String>,
    /// Tracker of the last rename source seen without its destination.
    pending_from: Option<usize>,
}

impl<R: Remote> SyncEngine<R> {
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            shadow: HashMap::new(),
            pending_from: None,
        }
    }

    /// Remote name last recorded for `path`.
    pub fn shadow_name(&self, path: &Path) -> Option<&str> {
        self.shadow.get(path).map(String::as_str)
    }

    /// Decides what `event` means remotely. `None` means nothing to do.
    pub async fn plan(&mut self, event: &WatchEvent) -> Option<SyncAction> {
        let path = &event.path;
        match event.kind {
            WatchKind::Create | WatchKind::Write => {
                if is_dir(path).await {
                    return None;
                }
                let name = base_name(path)?;
                Some(SyncAction::Upload {
                    path: path.clone(),
                    name,
                })
            }
            WatchKind::Remove => Some(SyncAction::Delete {
                name: self.known_name(path)?,
            }),
            WatchKind::Rename => self.plan_rename(event).await,
        }
    }

    async fn plan_rename(&mut self, event: &WatchEvent) -> Option<SyncAction> {
        let path = &event.path;
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);

        if let Some(previous) = &event.previous {
            self.pending_from = None;
            if !exists {
                return Some(SyncAction::Delete {
                    name: self.known_name(path)?,
                });
            }
            if is_dir(path).await {
                return None;
            }
            let new_name = base_name(path)?;
            let old_name = self.known_name(previous)?;
            if old_name == new_name {
                return Some(SyncAction::Upload {
                    path: path.clone(),
                    name: new_name,
                });
            }
            return Some(SyncAction::Rename {
                path: path.clone(),
                old_name,
                new_name,
            });
        }

        if !exists {
            // Source half of a rename: the name is gone from this directory.
            if event.tracker.is_some() {
                self.pending_from = event.tracker;
            }
            return Some(SyncAction::Delete {
                name: self.known_name(path)?,
            });
        }

        if event.tracker.is_some() && event.tracker == self.pending_from {
            // Destination half; the paired event that follows carries both paths.
            return None;
        }
        if is_dir(path).await {
            return None;
        }
        // Arrived from outside or under an unknown name.
        Some(SyncAction::Upload {
            path: path.clone(),
            name: base_name(path)?,
        })
    }

    /// Carries out `action` and updates the shadow map.
    pub async fn apply(&mut self, action: &SyncAction) -> Result<(), SyncError> {
        match action {
            SyncAction::Upload { path, name } => {
                self.shadow.insert(path.clone(), name.clone());
                self.remote.upload(path, name).await?;
                tracing::info!(path = %path.display(), name, "synced upload");
            }
            SyncAction::Delete { name } => {
                self.shadow.retain(|_, n| n != name);
                self.remote.delete(name).await?;
                tracing::info!(name, "synced delete");
            }
            SyncAction::Rename {
                path,
                old_name,
                new_name,
            } => {
                self.shadow.retain(|_, n| n != old_name);
                self.shadow.insert(path.clone(), new_name.clone());
                match self.remote.rename(old_name, new_name).await {
                    Ok(()) => tracing::info!(old_name, new_name, "synced rename"),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        tracing::info!(
                            old_name,
                            new_name,
                            "rename source missing remotely, uploading instead"
                        );
                        self.remote.upload(path, new_name).await?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Plans and applies `event`. Returns the action taken, if any.
    pub async fn handle(&mut self, event: WatchEvent) -> Result<Option<SyncAction>, SyncError> {
        let Some(action) = self.plan(&event).await else {
            tracing::debug!(path = %event.path.display(), kind = ?event.kind, "ignored event");
            return Ok(None);
        };
        self.apply(&action).await?;
        Ok(Some(action))
    }

    fn known_name(&self, path: &Path) -> Option<String> {
        self.shadow.get(path).cloned().or_else(|| base_name(path))
    }
}

fn base_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    Some(name.to_string())
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
