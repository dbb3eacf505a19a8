//! Listing and deleting finished files in the downloads directory.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("Deletion of files outside the downloads directory is not allowed.")]
    OutsideDownloadsDir,
    #[error("Cannot delete directories, only files.")]
    IsDirectory,
    #[error("downloads directory: {0}")]
    Io(#[from] io::Error),
}

/// One file in the downloads directory.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedFile {
    pub name: String,
    pub size: u64,
    /// Creation time (or modification time where unsupported), unix seconds.
    pub created: f64,
    pub path: PathBuf,
}

fn created_secs(meta: &fs::Metadata) -> f64 {
    meta.created()
        .or_else(|_| meta.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// List visible regular files, newest first. Creates `dir` if it is missing.
pub fn list_downloads(dir: &Path) -> Result<Vec<DownloadedFile>, FilesError> {
    fs::create_dir_all(dir)?;
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        // Files may disappear between read_dir and stat.
        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        if !meta.is_file() {
            continue;
        }
        files.push(DownloadedFile {
            name,
            size: meta.len(),
            created: created_secs(&meta),
            path: entry.path(),
        });
    }
    files.sort_by(|a, b| b.created.total_cmp(&a.created));
    Ok(files)
}

/// Delete `filename` from `dir`. Missing files are not an error.
pub fn delete_download(dir: &Path, filename: &str) -> Result<(), FilesError> {
    let relative = Path::new(filename);
    if filename.is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        tracing::warn!(filename, "refusing to delete path outside downloads directory");
        return Err(FilesError::OutsideDownloadsDir);
    }

    let base = dir.canonicalize()?;
    let path = base.join(relative);
    let resolved = match path.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "attempted to delete a file that does not exist");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    // Symlinks may still point outside.
    if !resolved.starts_with(&base) {
        tracing::warn!(path = %resolved.display(), "refusing to delete path outside downloads directory");
        return Err(FilesError::OutsideDownloadsDir);
    }
    if resolved.is_dir() {
        tracing::warn!(path = %resolved.display(), "refusing to delete directory");
        return Err(FilesError::IsDirectory);
    }

    match fs::remove_file(&resolved) {
        Ok(()) => {
            tracing::info!(path = %resolved.display(), "deleted file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %resolved.display(), "attempted to delete a file that does not exist");
            Ok(())
        }
        Err(e) => {
            tracing::error!(path = %resolved.display(), "could not delete file: {}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_skips_hidden_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"1234").unwrap();
        fs::write(dir.path().join(".partial"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let files = list_downloads(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.mp4");
        assert_eq!(files[0].size, 4);
        assert_eq!(files[0].path, dir.path().join("a.mp4"));
    }

    #[test]
    fn list_creates_missing_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("downloads");
        assert!(list_downloads(&missing).unwrap().is_empty());
        assert!(missing.is_dir());
    }

    #[test]
    fn list_is_newest_first() {
        let dir = tempdir().unwrap();
        for name in ["one.mp3", "two.mp3", "three.mp3"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = list_downloads(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.windows(2).all(|w| w[0].created >= w[1].created));
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("clip.mp4");
        fs::write(&file, b"data").unwrap();
        delete_download(dir.path(), "clip.mp4").unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn delete_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        delete_download(dir.path(), "nope.mp4").unwrap();
    }

    #[test]
    fn delete_refuses_traversal() {
        let root = tempdir().unwrap();
        let downloads = root.path().join("downloads");
        fs::create_dir(&downloads).unwrap();
        let outside = root.path().join("secret.txt");
        fs::write(&outside, b"keep").unwrap();

        for name in ["../secret.txt", "/etc/passwd", ""] {
            assert!(matches!(
                delete_download(&downloads, name),
                Err(FilesError::OutsideDownloadsDir)
            ));
        }
        assert!(outside.exists());
    }

    #[test]
    fn delete_refuses_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder")).unwrap();
        assert!(matches!(
            delete_download(dir.path(), "folder"),
            Err(FilesError::IsDirectory)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn delete_refuses_symlink_escape() {
        let root = tempdir().unwrap();
        let downloads = root.path().join("downloads");
        fs::create_dir(&downloads).unwrap();
        let outside = root.path().join("secret.txt");
        fs::write(&outside, b"keep").unwrap();
        std::os::unix::fs::symlink(&outside, downloads.join("link.txt")).unwrap();

        assert!(matches!(
            delete_download(&downloads, "link.txt"),
            Err(FilesError::OutsideDownloadsDir)
        ));
        assert!(outside.exists());
    }
}
