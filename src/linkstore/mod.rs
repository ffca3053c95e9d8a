//! Derived-artifact cache (linkstore)
//!
//! Maps `(original ref, canonical params)` to the ref of the derived artifact.
//! Implementations:
//! - `LogLinkStore`: append-only log file with an in-memory index
//! - `MemoryLinkStore`: bounded in-memory map (moka)
//!
//! Entries may go stale when the content store drops a derived blob; the
//! resolver tolerates that by racing a rebuild against the cached fetch.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::content::ContentRef;
use crate::transform::CanonicalParams;

mod log;
mod memory;

pub use self::log::LogLinkStore;
pub use self::memory::MemoryLinkStore;

/// Key of a linkstore entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub original: ContentRef,
    pub params: CanonicalParams,
}

impl CacheKey {
    pub fn new(original: ContentRef, params: CanonicalParams) -> Self {
        Self { original, params }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: "originalRef&canonicalParams"
        write!(f, "{}&{}", self.original, self.params)
    }
}

/// Linkstore error types
#[derive(Error, Debug)]
pub enum LinkStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("linkstore unavailable: {0}")]
    Unavailable(String),
}

/// Persistent mapping from (original, params) to a derived ref
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Most recent derived ref recorded for `key`, if any
    async fn lookup(&self, key: &CacheKey) -> Result<Option<ContentRef>, LinkStoreError>;

    /// Record `derived` for `key`
    ///
    /// Recording an identical pair twice is a no-op; a different value
    /// supersedes the previous one for subsequent lookups.
    async fn record(&self, key: CacheKey, derived: ContentRef) -> Result<(), LinkStoreError>;

    /// Number of distinct keys
    async fn len(&self) -> usize;

    /// Rewrite persisted state without superseded entries
    /// Default implementation is a no-op
    async fn compact(&self) -> Result<(), LinkStoreError> {
        Ok(())
    }
}
