//! Content store adapter
//!
//! This module defines the boundary to the external content store:
//! - `ContentRef`: opaque, immutable identifier of a stored blob
//! - `ContentStore`: get/put of blobs by identifier
//! - `PathResolver`: turns a human-readable path into a `ContentRef`
//!
//! Two stores ship with the crate: an in-memory map and a directory of
//! files, both addressed by the SHA-256 digest of the content.

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

mod fs;
mod memory;
mod resolver;

pub use self::fs::FsStore;
pub use self::memory::MemoryStore;
pub use self::resolver::{PathError, PathResolver, StoreResolver};

/// Opaque identifier of a blob in the content store
///
/// Equality is byte-for-byte. The character set excludes the separators used
/// by request strings and the linkstore log (`&`, `:`, `/`, whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRef(String);

impl ContentRef {
    /// Validate and wrap an identifier produced by a store
    ///
    /// A leading `.` is rejected so a ref can never name `.`, `..` or a
    /// store's hidden temp files.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let valid = !raw.is_empty()
            && !raw.starts_with('.')
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
        if !valid {
            return Err(StoreError::InvalidRef(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Content address of `data` (hex SHA-256)
    pub fn for_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Content store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("content not found: {0}")]
    NotFound(ContentRef),

    #[error("invalid content ref '{0}'")]
    InvalidRef(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The distinguishable "not found" condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Blob storage addressed by `ContentRef`
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch a blob; `StoreError::NotFound` when absent
    async fn get(&self, content: &ContentRef) -> Result<Bytes, StoreError>;

    /// Store a blob and return its identifier
    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError>;

    /// Check whether a blob is present
    async fn contains(&self, content: &ContentRef) -> Result<bool, StoreError> {
        match self.get(content).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
