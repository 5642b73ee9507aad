//! Download directory on the local filesystem.
//!
//! Part files are created next to their final destination, named
//! `.<prefix>.<uuid>.part`, so the final rename never crosses a filesystem.
//! `<prefix>` is the final name cut to [`PART_PREFIX_MAX`] bytes, which keeps
//! the part name short enough for any name the final file can have.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::download::{DownloadError, DownloadStore, PartFile};

/// Longest slice of the final file name carried into a part-file name.
pub const PART_PREFIX_MAX: usize = 64;

/// Saves downloads into one directory.
#[derive(Debug, Clone)]
pub struct DownloadDirectory {
    root: PathBuf,
}

impl DownloadDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory (and parents) if missing.
    pub async fn ensure_exists(&self) -> Result<(), DownloadError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| DownloadError::Io {
                path: self.root.clone(),
                source,
            })
    }
}

#[async_trait]
impl DownloadStore for DownloadDirectory {
    async fn begin(&self, file_name: &str) -> Result<Box<dyn PartFile>, DownloadError> {
        let part_path = self.root.join(part_file_name(file_name));
        let file = File::create(&part_path)
            .await
            .map_err(|source| DownloadError::Io {
                path: part_path.clone(),
                source,
            })?;
        debug!("receiving into {}", part_path.display());
        Ok(Box::new(FsPartFile {
            file,
            part_path,
            final_path: self.root.join(file_name),
        }))
    }
}

/// A part file on disk awaiting commit.
struct FsPartFile {
    file: File,
    part_path: PathBuf,
    final_path: PathBuf,
}

impl AsyncWrite for FsPartFile {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

#[async_trait]
impl PartFile for FsPartFile {
    async fn commit(self: Box<Self>) -> Result<PathBuf, DownloadError> {
        let FsPartFile {
            mut file,
            part_path,
            final_path,
        } = *self;

        let synced = async {
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        drop(file);
        if let Err(source) = synced {
            remove_quietly(&part_path).await;
            return Err(DownloadError::Io {
                path: part_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&part_path, &final_path).await {
            remove_quietly(&part_path).await;
            return Err(DownloadError::Io {
                path: final_path,
                source,
            });
        }
        Ok(final_path)
    }

    async fn discard(self: Box<Self>) {
        let FsPartFile { file, part_path, .. } = *self;
        drop(file);
        remove_quietly(&part_path).await;
    }
}

/// Hidden, unique part-file name for `file_name`, cut at a character
/// boundary.
fn part_file_name(file_name: &str) -> String {
    let mut end = file_name.len().min(PART_PREFIX_MAX);
    while !file_name.is_char_boundary(end) {
        end -= 1;
    }
    format!(".{}.{}.part", &file_name[..end], Uuid::new_v4())
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("could not remove {}: {e}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scratch(PathBuf);

    impl Scratch {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("fileshare-dldir-{}", Uuid::new_v4())))
        }

        fn entries(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(&self.0)
                .unwrap()
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect();
            names.sort();
            names
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_directory() {
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(scratch.0.join("nested"));

        dir.ensure_exists().await.unwrap();

        assert!(dir.root().is_dir());
    }

    #[tokio::test]
    async fn test_part_file_hidden_until_commit() {
        // Arrange
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(&scratch.0);
        dir.ensure_exists().await.unwrap();

        // Act
        let mut part = dir.begin("report.txt").await.unwrap();
        part.write_all(b"partial").await.unwrap();
        let during = scratch.entries();
        let path = part.commit().await.unwrap();

        // Assert
        assert_eq!(during.len(), 1);
        assert!(during[0].starts_with(".report.txt.") && during[0].ends_with(".part"));
        assert_eq!(path, scratch.0.join("report.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"partial");
        assert_eq!(scratch.entries(), vec!["report.txt"]);
    }

    #[tokio::test]
    async fn test_commit_replaces_existing_file() {
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(&scratch.0);
        dir.ensure_exists().await.unwrap();
        std::fs::write(scratch.0.join("a.txt"), b"old").unwrap();

        let mut part = dir.begin("a.txt").await.unwrap();
        part.write_all(b"new").await.unwrap();
        part.commit().await.unwrap();

        assert_eq!(std::fs::read(scratch.0.join("a.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_discard_leaves_directory_empty() {
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(&scratch.0);
        dir.ensure_exists().await.unwrap();

        let mut part = dir.begin("gone.bin").await.unwrap();
        part.write_all(b"xyz").await.unwrap();
        part.discard().await;

        assert!(scratch.entries().is_empty());
    }

    #[tokio::test]
    async fn test_longest_file_names_still_download() {
        // Arrange: 250 bytes fits NAME_MAX (255) but not with a long suffix.
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(&scratch.0);
        dir.ensure_exists().await.unwrap();
        let name = "n".repeat(250);

        // Act
        let mut part = dir.begin(&name).await.unwrap();
        part.write_all(b"long").await.unwrap();
        let path = part.commit().await.unwrap();

        // Assert
        assert_eq!(path, scratch.0.join(&name));
        assert_eq!(scratch.entries(), vec![name]);
    }

    #[test]
    fn test_part_file_name_truncates_at_char_boundary() {
        // Each euro sign is three bytes, so 64 bytes falls mid-character.
        let name = "€".repeat(40);

        let part = part_file_name(&name);

        assert!(part.starts_with(&format!(".{}.", "€".repeat(21))));
        assert!(part.ends_with(".part"));
        assert!(part.len() <= 1 + PART_PREFIX_MAX + 1 + 36 + 5);
    }

    #[tokio::test]
    async fn test_begin_in_missing_directory_is_error() {
        let scratch = Scratch::new();
        let dir = DownloadDirectory::new(scratch.0.join("absent"));

        let result = dir.begin("x").await;

        assert!(matches!(result, Err(DownloadError::Io { .. })));
    }
}
