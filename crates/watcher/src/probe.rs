//! Filesystem probes used to discover symlinks

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// A directory entry with the one attribute the watcher cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Full path of the entry
    pub path: PathBuf,
    /// Whether the entry itself is a symbolic link (not followed)
    pub is_symlink: bool,
}

/// Directory listing and link-type detection
#[async_trait]
pub trait FsProbe: Send + Sync {
    /// List the direct entries of `dir`
    async fn list(&self, dir: &Path) -> io::Result<Vec<EntryMetadata>>;

    /// Whether `path` is a symbolic link; a path that no longer exists is not
    async fn is_symlink(&self, path: &Path) -> io::Result<bool>;
}

/// Probe backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FsProbe for LocalFs {
    async fn list(&self, dir: &Path) -> io::Result<Vec<EntryMetadata>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // DirEntry::file_type does not traverse links
            let file_type = entry.file_type().await?;
            listed.push(EntryMetadata {
                path: entry.path(),
                is_symlink: file_type.is_symlink(),
            });
        }
        Ok(listed)
    }

    async fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => Ok(metadata.file_type().is_symlink()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
