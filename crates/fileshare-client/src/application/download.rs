//! Download storage capability.
//!
//! A download is written to a *part file* while its payload arrives.  Only
//! after the server's `FILE-DONE` marker has been seen is the part file
//! committed under its final name; on any failure it is discarded, so a
//! half-received file never appears in the download directory.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Errors raised by a [`DownloadStore`].
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where completed downloads end up.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    /// Opens a new, empty part file destined to become `file_name`.
    ///
    /// `file_name` is a bare base name (see [`download_name`]).
    async fn begin(&self, file_name: &str) -> Result<Box<dyn PartFile>, DownloadError>;
}

/// A download in progress.
#[async_trait]
pub trait PartFile: AsyncWrite + Send + Unpin {
    /// Flushes and moves the file to its final name, replacing any previous
    /// file of that name.  Returns the final path.
    async fn commit(self: Box<Self>) -> Result<PathBuf, DownloadError>;

    /// Deletes the partial data.  Failures are logged, not returned.
    async fn discard(self: Box<Self>);
}

/// Derives the local file name for a download request.
///
/// Every leading path component is stripped, treating both `/` and `\` as
/// separators, so a request can never write outside the download directory.
/// Returns `None` when nothing usable is left (`""`, `"dir/"`, `".."`).
pub fn download_name(request: &str) -> Option<&str> {
    let base = request.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        name => Some(name),
    }
}
