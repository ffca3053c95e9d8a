//! Filesystem content store (portable, tokio::fs)

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ContentRef, ContentStore, StoreError};

/// Content store with one file per blob under a root directory
pub struct FsStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, content: &ContentRef) -> PathBuf {
        self.root.join(content.as_str())
    }

    /// Delete a blob; missing blobs are ignored
    pub async fn remove(&self, content: &ContentRef) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.blob_path(content)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ContentStore for FsStore {
    async fn get(&self, content: &ContentRef) -> Result<Bytes, StoreError> {
        match tokio::fs::read(self.blob_path(content)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(content.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError> {
        let content = ContentRef::for_bytes(&data);
        let path = self.blob_path(&content);
        if tokio::fs::try_exists(&path).await? {
            return Ok(content);
        }

        tokio::fs::create_dir_all(&self.root).await?;

        // Write to a unique temp file, then atomically rename
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .root
            .join(format!(".{}.{}.{}.tmp", content, std::process::id(), seq));
        tokio::fs::write(&temp_path, &data).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(content)
    }

    async fn contains(&self, content: &ContentRef) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.blob_path(content)).await?)
    }
}
