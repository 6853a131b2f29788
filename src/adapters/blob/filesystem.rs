//! Filesystem-backed blob tier.
//!
//! Keys map to paths under a root directory. Writes go through a temp file
//! and rename so a crashed process never leaves a truncated transcript.

use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::foundation::{Backend, CoreError, ErrorCode, StorageOp};
use crate::ports::BlobStore;

/// Filesystem-backed [`BlobStore`] rooted at a directory.
#[derive(Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        // Keys are internal, but reject traversal outright.
        if key.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(CoreError::infrastructure(
                ErrorCode::StorageError,
                Backend::Blob,
                StorageOp::Read,
                format!("invalid blob key '{}'", key),
            ));
        }
        Ok(self.root.join(key))
    }

    fn error(op: StorageOp, path: &Path, e: std::io::Error) -> CoreError {
        CoreError::infrastructure(
            ErrorCode::StorageError,
            Backend::Blob,
            op,
            format!("{}: {}", path.display(), e),
        )
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::error(StorageOp::Read, &path, e)),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::error(StorageOp::Write, parent, e))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| Self::error(StorageOp::Write, &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::error(StorageOp::Write, &path, e))
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::error(StorageOp::Delete, &path, e)),
        }
    }
}
