use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::id::PasteId;

/// Suffix of the hidden entries a paste is written to before being linked into place
const PARTIAL_SUFFIX: &str = "partial";

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("paste `{0}` doesn't exist")]
    NotFound(PasteId),
    #[error("paste `{0}` already exists")]
    AlreadyExists(PasteId),
    #[error("couldn't {operation} paste `{id}`: {source}")]
    Io {
        id: PasteId,
        operation: &'static str,
        source: io::Error,
    },
}

impl BlobError {
    fn io(id: &PasteId, operation: &'static str, source: io::Error) -> BlobError {
        BlobError::Io {
            id: id.clone(),
            operation,
            source,
        }
    }
}

/// Stores pastes as files of a single flat directory, one file per paste,
/// named after its id and holding the submitted bytes as they are.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> BlobStore {
        BlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a new paste.
    ///
    /// The storage directory is created when missing. Content goes to a hidden
    /// `.<id>.<nonce>.partial` entry first and is then hard linked under `id`,
    /// so a paste is either complete or absent and an existing paste is never
    /// replaced: a taken id fails with [`BlobError::AlreadyExists`].
    pub async fn put(&self, id: &PasteId, bytes: &[u8]) -> Result<(), BlobError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| BlobError::io(id, "create storage directory for", source))?;
        let partial = self.root.join(format!(
            ".{}.{}.{}",
            id,
            Uuid::new_v4().simple(),
            PARTIAL_SUFFIX
        ));
        let result = self.write_and_link(id, &partial, bytes).await;
        if let Err(err) = fs::remove_file(&partial).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(%id, path = %partial.display(), error = %err, "couldn't remove partial paste");
            }
        }
        result
    }

    async fn write_and_link(
        &self,
        id: &PasteId,
        partial: &Path,
        bytes: &[u8],
    ) -> Result<(), BlobError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(partial)
            .await
            .map_err(|source| BlobError::io(id, "create", source))?;
        file.write_all(bytes)
            .await
            .map_err(|source| BlobError::io(id, "write", source))?;
        file.flush()
            .await
            .map_err(|source| BlobError::io(id, "write", source))?;
        file.sync_all()
            .await
            .map_err(|source| BlobError::io(id, "sync", source))?;
        drop(file);

        match fs::hard_link(partial, self.path(id)).await {
            Ok(()) => {
                debug!(%id, bytes = bytes.len(), "paste written");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(BlobError::AlreadyExists(id.clone()))
            }
            Err(source) => Err(BlobError::io(id, "link", source)),
        }
    }

    /// Read the whole content of a paste
    pub async fn get(&self, id: &PasteId) -> Result<Vec<u8>, BlobError> {
        match fs::read(self.path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(id.clone())),
            Err(source) => Err(BlobError::io(id, "read", source)),
        }
    }

    /// Check if a paste exists without reading it. Only a missing entry is
    /// `Ok(false)`; any other failure to look it up is an error.
    pub async fn exists(&self, id: &PasteId) -> Result<bool, BlobError> {
        fs::try_exists(self.path(id))
            .await
            .map_err(|source| BlobError::io(id, "check", source))
    }

    fn path(&self, id: &PasteId) -> PathBuf {
        self.root.join(id.as_str())
    }
}
