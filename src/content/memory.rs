//! In-memory content store

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ContentRef, ContentStore, StoreError};

/// Content store that keeps blobs in a shared map
#[derive(Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<ContentRef, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a blob, as a garbage-collecting store would
    pub fn remove(&self, content: &ContentRef) -> bool {
        self.blobs.write().remove(content).is_some()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, content: &ContentRef) -> Result<Bytes, StoreError> {
        self.blobs
            .read()
            .get(content)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(content.clone()))
    }

    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError> {
        let content = ContentRef::for_bytes(&data);
        self.blobs.write().entry(content.clone()).or_insert(data);
        Ok(content)
    }

    async fn contains(&self, content: &ContentRef) -> Result<bool, StoreError> {
        Ok(self.blobs.read().contains_key(content))
    }
}
