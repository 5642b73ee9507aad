//! Repository capability: the file store a session lists and downloads from.
//!
//! The application layer only sees this trait.  The filesystem-backed
//! implementation lives in `infrastructure::repository::fs`; an in-memory one
//! in `infrastructure::repository::memory` is used by tests.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Failure of the backing store, other than "no such file".
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("cannot list repository: {0}")]
    List(#[source] std::io::Error),

    #[error("cannot open {name:?}: {source}")]
    Open {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// An opened repository file, ready to stream.
pub struct RepositoryFile {
    /// Exact number of bytes `reader` will yield.
    pub size: u64,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl fmt::Debug for RepositoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryFile")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Read-only file store exposed to clients.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Names of every regular file, sorted ascending.
    async fn list_names(&self) -> Result<Vec<String>, RepositoryError>;

    /// Opens `name` for reading.
    ///
    /// Returns `Ok(None)` if no regular file of exactly that name exists,
    /// including when `name` is not a plain file name (see [`is_plain_name`]).
    async fn open(&self, name: &str) -> Result<Option<RepositoryFile>, RepositoryError>;
}

/// Returns `true` if `name` can only refer to an entry directly inside the
/// repository and survives the wire format intact.
///
/// Rejected: empty names, `.` and `..`, either path separator, the `,` that
/// separates names in a `FILES` line, and control characters such as `\n`
/// that would split a control line.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ','])
        && !name.chars().any(char::is_control)
}
