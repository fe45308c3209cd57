use std::path::Path;

use filemirror_transfer::is_plain_name;

use crate::SyncError;

/// Copies `source` into `mirror/name` unless a file with that name is
/// already there.
///
/// First write wins: an existing mirror copy is left untouched whatever
/// its content. Returns `true` if a copy was made.
pub async fn prime_mirror(source: &Path, mirror: &Path, name: &str) -> Result<bool, SyncError> {
    if !is_plain_name(name) {
        return Err(SyncError::InvalidName(name.to_string()));
    }
    if !tokio::fs::try_exists(source).await? {
        return Err(SyncError::NotFound(source.to_path_buf()));
    }

    let target = mirror.join(name);
    if tokio::fs::try_exists(&target).await? {
        return Ok(false);
    }

    tokio::fs::create_dir_all(mirror).await?;
    let bytes = tokio::fs::copy(source, &target).await?;
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        bytes,
        "primed mirror"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copies_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src.txt");
        std::fs::write(&source, b"payload").unwrap();
        let mirror = tmp.path().join("downloads");

        assert!(prime_mirror(&source, &mirror, "copy.txt").await.unwrap());
        assert_eq!(std::fs::read(mirror.join("copy.txt")).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn existing_copy_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src.txt");
        std::fs::write(&source, b"new").unwrap();
        let mirror = tmp.path().join("downloads");
        std::fs::create_dir_all(&mirror).unwrap();
        std::fs::write(mirror.join("doc.txt"), b"old").unwrap();

        assert!(!prime_mirror(&source, &mirror, "doc.txt").await.unwrap());
        assert_eq!(std::fs::read(mirror.join("doc.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn file_already_in_mirror_is_left_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("same.txt");
        std::fs::write(&path, b"x").unwrap();

        assert!(!prime_mirror(&path, tmp.path(), "same.txt").await.unwrap());
    }

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = prime_mirror(&tmp.path().join("nope"), tmp.path(), "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn unsafe_name_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("src.txt");
        std::fs::write(&source, b"x").unwrap();
        let err = prime_mirror(&source, &tmp.path().join("m"), "../out.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidName(_)));
        assert!(!tmp.path().join("out.txt").exists());
    }
}
