//! In-memory repository used by tests.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::repository::{is_plain_name, FileRepository, RepositoryError, RepositoryFile};

/// Fixed set of named files held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    files: BTreeMap<String, Arc<Vec<u8>>>,
}

impl MemoryRepository {
    pub fn from_files<N, I>(files: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<u8>)>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(name, body)| (name.into(), Arc::new(body)))
                .collect(),
        }
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, name: impl Into<String>, body: Vec<u8>) {
        self.files.insert(name.into(), Arc::new(body));
    }
}

/// Reads from a shared buffer without copying it per download.
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[async_trait]
impl FileRepository for MemoryRepository {
    async fn list_names(&self) -> Result<Vec<String>, RepositoryError> {
        // BTreeMap keys are already sorted.
        Ok(self
            .files
            .keys()
            .filter(|name| is_plain_name(name))
            .cloned()
            .collect())
    }

    async fn open(&self, name: &str) -> Result<Option<RepositoryFile>, RepositoryError> {
        if !is_plain_name(name) {
            return Ok(None);
        }
        Ok(self.files.get(name).map(|body| RepositoryFile {
            size: body.len() as u64,
            reader: Box::new(Cursor::new(SharedBytes(Arc::clone(body)))),
        }))
    }
}
