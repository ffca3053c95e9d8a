//! Path resolution
//!
//! Turns a human-readable path into a base `ContentRef`. Full DAG traversal
//! belongs to an external service; `StoreResolver` covers the direct forms
//! `/ipfs/<ref>`, `/ipld/<ref>` and a bare `<ref>`.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::{ContentRef, ContentStore, StoreError};

/// Path resolution errors
#[derive(Error, Debug)]
pub enum PathError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("store error while resolving path: {0}")]
    Store(#[from] StoreError),
}

impl PathError {
    fn invalid(path: &str, reason: impl Into<String>) -> Self {
        PathError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolves a path string to the identifier of its content
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<ContentRef, PathError>;
}

/// Resolver backed directly by a content store
pub struct StoreResolver {
    store: Arc<dyn ContentStore>,
}

impl StoreResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PathResolver for StoreResolver {
    async fn resolve(&self, path: &str) -> Result<ContentRef, PathError> {
        let rooted = path.starts_with('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let raw = match segments.as_slice() {
            [] => return Err(PathError::invalid(path, "empty path")),
            [id] if !rooted => *id,
            [_] => return Err(PathError::invalid(path, "missing content identifier")),
            ["ipfs" | "ipld", id] => *id,
            [namespace, _] => {
                return Err(PathError::invalid(
                    path,
                    format!("unsupported path namespace: {}", namespace),
                ))
            }
            _ => return Err(PathError::invalid(path, "sub-paths are not supported")),
        };

        let content = ContentRef::parse(raw).map_err(|e| PathError::invalid(path, e.to_string()))?;
        if !self.store.contains(&content).await? {
            return Err(PathError::NotFound(path.to_string()));
        }

        tracing::trace!(path = %path, content = %content, "Resolved path");
        Ok(content)
    }
}
