//! Request and result types for the resolver
//!
//! Request syntax: `<base-path>&<param-fragment>`. The first `&` separates
//! the path from the parameters; without one the request asks for the base
//! content untransformed.

use bytes::Bytes;

use crate::content::ContentRef;
use crate::error::ResolveError;
use crate::linkstore::CacheKey;
use crate::transform::{CanonicalParams, TransformSpec};

/// Request string split into its path and parsed parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub path: String,
    pub spec: TransformSpec,
}

/// Split a request string into base path and transform spec
pub fn parse_request(raw: &str) -> Result<ParsedRequest, ResolveError> {
    let (path, fragment) = raw.split_once('&').unwrap_or((raw, ""));
    let spec = TransformSpec::parse(fragment).map_err(ResolveError::InvalidParameter)?;
    Ok(ParsedRequest {
        path: path.to_string(),
        spec,
    })
}

/// Back-reference from a derived artifact to the request that produced it
///
/// Holds the effective spec (after aspect resolution), so rebuilding from a
/// marker lands on the same cache key as the original resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PendingMarker {
    original: ContentRef,
    spec: TransformSpec,
    params: CanonicalParams,
}

impl PendingMarker {
    pub fn new(original: ContentRef, spec: TransformSpec) -> Self {
        let params = spec.canonicalize();
        Self {
            original,
            spec,
            params,
        }
    }

    pub fn original(&self) -> &ContentRef {
        &self.original
    }

    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    pub fn params(&self) -> &CanonicalParams {
        &self.params
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.original.clone(), self.params.clone())
    }
}

/// A resolution request against an already-resolved base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub base: ContentRef,
    pub spec: TransformSpec,
    /// When present, the marker's effective spec is used as-is and no
    /// aspect probing happens
    pub marker: Option<PendingMarker>,
}

impl ResourceRequest {
    pub fn new(base: ContentRef, spec: TransformSpec) -> Self {
        Self {
            base,
            spec,
            marker: None,
        }
    }

    pub fn from_marker(marker: PendingMarker) -> Self {
        Self {
            base: marker.original.clone(),
            spec: marker.spec,
            marker: Some(marker),
        }
    }
}

/// Which path produced a resolved artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    /// No transform was requested; the base content itself
    Base,
    /// Cache miss, built directly
    Built,
    /// Cache hit, the cached derived ref was fetched
    Cached,
    /// Cache hit, but the rebuild finished first (or the cached ref was gone)
    Rebuilt,
}

impl ResolvedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedVia::Base => "base",
            ResolvedVia::Built => "built",
            ResolvedVia::Cached => "cached",
            ResolvedVia::Rebuilt => "rebuilt",
        }
    }
}

/// Successfully resolved artifact
#[derive(Debug, Clone)]
pub struct Resolved {
    pub content: ContentRef,
    pub data: Bytes,
    pub via: ResolvedVia,
    /// Present for derived artifacts
    pub marker: Option<PendingMarker>,
}
