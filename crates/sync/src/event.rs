//! Translation of raw `notify` events.

use std::path::PathBuf;

use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RenameMode};

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    Create,
    Write,
    Rename,
    Remove,
}

/// One change to a watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
    /// Source path of a rename, when the observer reported both halves.
    pub previous: Option<PathBuf>,
    /// Observer cookie linking the halves of one rename.
    pub tracker: Option<usize>,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchKind) -> Self {
        Self {
            path: path.into(),
            kind,
            previous: None,
            tracker: None,
        }
    }

    /// A rename whose source and destination are both known.
    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            path: to.into(),
            kind: WatchKind::Rename,
            previous: Some(from.into()),
            tracker: None,
        }
    }

    pub fn with_tracker(mut self, tracker: usize) -> Self {
        self.tracker = Some(tracker);
        self
    }
}

/// Splits a `notify` event into per-path watch events.
///
/// Folder creation, metadata changes and access events produce nothing.
pub fn classify(event: notify::Event) -> Vec<WatchEvent> {
    let tracker = event.tracker();
    let each = |paths: Vec<PathBuf>, kind: WatchKind| -> Vec<WatchEvent> {
        paths
            .into_iter()
            .map(|p| WatchEvent {
                path: p,
                kind,
                previous: None,
                tracker,
            })
            .collect()
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => each(event.paths, WatchKind::Create),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
            each(event.paths, WatchKind::Write)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut paths = event.paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![WatchEvent {
                    path: to,
                    kind: WatchKind::Rename,
                    previous: Some(from),
                    tracker,
                }],
                _ => Vec::new(),
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => each(event.paths, WatchKind::Rename),
        EventKind::Remove(_) => each(event.paths, WatchKind::Remove),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        paths
            .iter()
            .fold(notify::Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    #[test]
    fn create_and_write() {
        let got = classify(event(EventKind::Create(CreateKind::File), &["/d/a.txt"]));
        assert_eq!(got, vec![WatchEvent::new("/d/a.txt", WatchKind::Create)]);

        let got = classify(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d/a.txt"],
        ));
        assert_eq!(got, vec![WatchEvent::new("/d/a.txt", WatchKind::Write)]);
    }

    #[test]
    fn folders_and_metadata_ignored() {
        assert!(classify(event(EventKind::Create(CreateKind::Folder), &["/d/sub"])).is_empty());
        assert!(
            classify(event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                &["/d/a.txt"],
            ))
            .is_empty()
        );
    }

    #[test]
    fn paired_rename_carries_previous_path() {
        let got = classify(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/d/a.txt", "/d/b.txt"],
            )
            .set_tracker(7),
        );
        assert_eq!(
            got,
            vec![WatchEvent::renamed("/d/a.txt", "/d/b.txt").with_tracker(7)]
        );
    }

    #[test]
    fn rename_halves_keep_tracker() {
        let got = classify(
            event(
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                &["/d/a.txt"],
            )
            .set_tracker(3),
        );
        assert_eq!(
            got,
            vec![WatchEvent::new("/d/a.txt", WatchKind::Rename).with_tracker(3)]
        );
    }

    #[test]
    fn remove_each_path() {
        let got = classify(event(
            EventKind::Remove(RemoveKind::File),
            &["/d/a.txt", "/d/b.txt"],
        ));
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|e| e.kind == WatchKind::Remove));
    }
}
