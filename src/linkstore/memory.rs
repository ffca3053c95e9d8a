//! In-memory linkstore using moka

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use super::{CacheKey, LinkStore, LinkStoreError};
use crate::content::ContentRef;

/// Bounded in-memory linkstore; least-used entries are evicted past `max_entries`
#[derive(Clone)]
pub struct MemoryLinkStore {
    links: MokaCache<CacheKey, ContentRef>,
}

impl MemoryLinkStore {
    pub fn new(max_entries: u64) -> Self {
        Self {
            links: MokaCache::builder().max_capacity(max_entries).build(),
        }
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ContentRef>, LinkStoreError> {
        Ok(self.links.get(key).await)
    }

    async fn record(&self, key: CacheKey, derived: ContentRef) -> Result<(), LinkStoreError> {
        self.links.insert(key, derived).await;
        Ok(())
    }

    async fn len(&self) -> usize {
        self.links.run_pending_tasks().await;
        self.links.entry_count() as usize
    }
}
