// Error types module

use thiserror::Error;

use crate::content::{ContentRef, PathError, StoreError};
use crate::linkstore::LinkStoreError;
use crate::transform::TransformError;

/// Failure while building a derived artifact from its original
#[derive(Error, Debug)]
pub enum BuildError {
    /// The original could not be fetched
    #[error("failed to fetch original {content}: {source}")]
    Fetch {
        content: ContentRef,
        #[source]
        source: StoreError,
    },

    /// Decode, transform or encode failed
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// The derived artifact could not be written to the content store
    #[error("failed to store derived artifact: {0}")]
    Store(#[source] StoreError),

    /// The cache entry could not be recorded
    #[error("failed to record cache entry: {0}")]
    Record(#[from] LinkStoreError),

    /// The blocking transform task panicked or was cancelled
    #[error("transform task failed: {0}")]
    Task(String),
}

/// Terminal outcome of a failed resolution
///
/// Categorizes errors so callers know whether resubmitting can help:
/// parameter and dimension errors need a corrected request, build and
/// exhaustion errors may succeed on a plain retry.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Malformed, unknown, duplicate or out-of-range parameter
    #[error("{0}")]
    InvalidParameter(TransformError),

    /// The base path is malformed or uses an unsupported form
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Base content is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Parameters are well-formed but cannot be applied to this source
    /// (InvalidDimensions, CropOutOfBounds)
    #[error("{0}")]
    Transform(TransformError),

    /// Building the derived artifact failed with nothing cached to fall back on
    #[error("build failed: {0}")]
    Build(BuildError),

    /// Both the cached fetch and the rebuild failed
    #[error("resolution exhausted: cached fetch failed ({cached}); rebuild failed ({rebuild})")]
    ResolutionExhausted {
        cached: Box<StoreError>,
        rebuild: Box<BuildError>,
    },

    /// The caller cancelled the resolution
    #[error("resolution cancelled")]
    Cancelled,

    /// The configured deadline elapsed
    #[error("resolution timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },

    /// The path resolver's backing store failed
    #[error("path resolution failed: {0}")]
    Resolver(StoreError),
}

impl ResolveError {
    /// Whether re-issuing the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::Build(_)
                | ResolveError::ResolutionExhausted { .. }
                | ResolveError::TimedOut { .. }
                | ResolveError::Resolver(_)
        )
    }

    /// Map a build failure with no cached fallback onto the caller-facing taxonomy
    pub fn from_build(err: BuildError) -> Self {
        match err {
            BuildError::Transform(e) if e.is_caller_error() => ResolveError::Transform(e),
            BuildError::Fetch { content, source } if source.is_not_found() => {
                ResolveError::NotFound(content.to_string())
            }
            other => ResolveError::Build(other),
        }
    }

    /// Map a failed fetch of base content
    pub fn from_fetch(content: &ContentRef, err: StoreError) -> Self {
        if err.is_not_found() {
            ResolveError::NotFound(content.to_string())
        } else {
            ResolveError::Build(BuildError::Fetch {
                content: content.clone(),
                source: err,
            })
        }
    }
}

impl From<PathError> for ResolveError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::NotFound(path) => ResolveError::NotFound(path),
            PathError::InvalidPath { path, reason } => ResolveError::InvalidPath { path, reason },
            PathError::Store(e) => ResolveError::Resolver(e),
        }
    }
}
