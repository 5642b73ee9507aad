//! Filesystem-backed repository: one flat directory of regular files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tracing::{debug, info};

use crate::application::repository::{is_plain_name, FileRepository, RepositoryError, RepositoryFile};

/// Serves the regular files directly inside `root`.
///
/// Subdirectories are neither listed nor served.  A missing `root` behaves
/// like an empty directory.
#[derive(Debug, Clone)]
pub struct FsRepository {
    root: PathBuf,
}

impl FsRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the repository directory (and parents) if it does not exist.
    pub async fn ensure_exists(&self) -> std::io::Result<()> {
        if fs::try_exists(&self.root).await? {
            return Ok(());
        }
        fs::create_dir_all(&self.root).await?;
        info!("created repository directory {}", self.root.display());
        Ok(())
    }
}

#[async_trait]
impl FileRepository for FsRepository {
    async fn list_names(&self) -> Result<Vec<String>, RepositoryError> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::List(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(RepositoryError::List)? {
            // Follows symlinks; dangling links are skipped.
            let is_file = fs::metadata(entry.path())
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) if is_plain_name(&name) => names.push(name),
                Ok(name) => debug!("skipping file name unfit for listing {name:?}"),
                Err(raw) => debug!("skipping non-UTF-8 file name {raw:?}"),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn open(&self, name: &str) -> Result<Option<RepositoryFile>, RepositoryError> {
        if !is_plain_name(name) {
            return Ok(None);
        }
        let open_error = |source| RepositoryError::Open {
            name: name.to_string(),
            source,
        };

        let file = match File::open(self.root.join(name)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(open_error(e)),
        };
        let meta = file.metadata().await.map_err(open_error)?;
        if !meta.is_file() {
            return Ok(None);
        }

        Ok(Some(RepositoryFile {
            size: meta.len(),
            reader: Box::new(file),
        }))
    }
}
