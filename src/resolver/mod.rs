//! Resolution orchestrator
//!
//! Turns a request string into a resolved artifact:
//!
//! ```text
//! ParsingRequest → KeyFormed → CacheHit  → RacingFetch → Resolved | Failed
//!                            → CacheMiss → DirectBuild → Resolved | Failed
//! ```
//!
//! On a cache hit the cached derived ref is fetched while the artifact is
//! rebuilt from its original in parallel; the first success wins. Cached refs
//! can go stale when the content store drops derived blobs, and racing hides
//! that latency. The rebuild runs as its own task, so a rebuild that loses the
//! race still finishes and refreshes the linkstore entry.

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, LinkStoreBackend, ResolverConfig, StoreBackend};
use crate::content::{
    ContentRef, ContentStore, FsStore, MemoryStore, PathResolver, StoreError, StoreResolver,
};
use crate::error::{BuildError, ResolveError};
use crate::linkstore::{CacheKey, LinkStore, LogLinkStore, MemoryLinkStore};
use crate::race::{race_ok, Branch, RaceError};
use crate::transform::{TransformEngine, TransformSpec};

mod request;
mod stats;

pub use request::{
    parse_request, ParsedRequest, PendingMarker, ResolvedVia, Resolved, ResourceRequest,
};
pub use stats::{ResolverStats, StatsSnapshot};

/// Artifact produced by a successful build
struct Built {
    content: ContentRef,
    data: Bytes,
    marker: PendingMarker,
}

/// Everything a build needs, cheap to clone into a spawned task
#[derive(Clone)]
struct BuildContext {
    store: Arc<dyn ContentStore>,
    links: Arc<dyn LinkStore>,
    engine: Arc<TransformEngine>,
    stats: Arc<ResolverStats>,
}

impl BuildContext {
    /// Fetch the original (unless `source` was prefetched), transform, store, record
    async fn build(
        &self,
        marker: &PendingMarker,
        source: Option<Bytes>,
    ) -> Result<Built, BuildError> {
        let original = marker.original();
        let source = match source {
            Some(data) => data,
            None => self
                .store
                .get(original)
                .await
                .map_err(|source| BuildError::Fetch {
                    content: original.clone(),
                    source,
                })?,
        };

        let engine = Arc::clone(&self.engine);
        let spec = *marker.spec();
        let transformed = tokio::task::spawn_blocking(move || engine.apply(&source, &spec))
            .await
            .map_err(|e| BuildError::Task(e.to_string()))??;

        // The engine reports the spec it actually applied; key on that
        let effective = PendingMarker::new(original.clone(), transformed.spec);
        let data = Bytes::from(transformed.data);
        let content = self
            .store
            .put(data.clone())
            .await
            .map_err(BuildError::Store)?;
        self.links.record(effective.key(), content.clone()).await?;
        self.stats.increment_builds();

        tracing::debug!(
            original = %original,
            params = %effective.params(),
            derived = %content,
            source_width = transformed.source_size.0,
            source_height = transformed.source_size.1,
            output_width = transformed.output_size.0,
            output_height = transformed.output_size.1,
            format = transformed.format.as_str(),
            "Built derived artifact"
        );

        Ok(Built {
            content,
            data,
            marker: effective,
        })
    }
}

/// Resolves requests against a content store, a path resolver and a linkstore
pub struct Resolver {
    store: Arc<dyn ContentStore>,
    paths: Arc<dyn PathResolver>,
    links: Arc<dyn LinkStore>,
    engine: Arc<TransformEngine>,
    config: ResolverConfig,
    stats: Arc<ResolverStats>,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        paths: Arc<dyn PathResolver>,
        links: Arc<dyn LinkStore>,
        engine: TransformEngine,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            paths,
            links,
            engine: Arc::new(engine),
            config,
            stats: Arc::new(ResolverStats::new()),
        }
    }

    /// Build a resolver with the backends selected in `config`
    ///
    /// Paths are resolved directly against the configured content store.
    pub async fn from_config(
        config: &Config,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        config.validate()?;

        let store: Arc<dyn ContentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Fs => Arc::new(FsStore::new(&config.store.root)),
        };
        let links: Arc<dyn LinkStore> = match config.linkstore.backend {
            LinkStoreBackend::Memory => Arc::new(MemoryLinkStore::new(config.linkstore.max_entries)),
            LinkStoreBackend::Log => Arc::new(
                LogLinkStore::open_with(&config.linkstore.path, config.linkstore.sync_writes)
                    .await?,
            ),
        };
        let paths = Arc::new(StoreResolver::new(Arc::clone(&store)));

        Ok(Self::new(
            store,
            paths,
            links,
            TransformEngine::new(config.transform.clone()),
            config.resolver.clone(),
        ))
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn links(&self) -> &Arc<dyn LinkStore> {
        &self.links
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// The linkstore key a request for `base` with `spec` is cached under
    ///
    /// `a=0` needs the source dimensions, so the base is fetched in that case.
    pub async fn cache_key(
        &self,
        base: ContentRef,
        spec: TransformSpec,
    ) -> Result<CacheKey, ResolveError> {
        let (marker, _) = self.form_key(base, spec).await?;
        Ok(marker.key())
    }

    /// Resolve a request string such as `/ipfs/<ref>&w=100,h=50`
    pub async fn resolve(&self, request: &str) -> Result<Resolved, ResolveError> {
        self.resolve_until(request, std::future::pending::<()>())
            .await
    }

    /// Resolve a request string, giving up with `Cancelled` once `cancel` completes
    ///
    /// A rebuild already running when the resolution is abandoned keeps going
    /// in the background and may still record its result.
    pub async fn resolve_until<C>(&self, request: &str, cancel: C) -> Result<Resolved, ResolveError>
    where
        C: Future<Output = ()>,
    {
        self.stats.increment_requests();
        let result = self.supervise(self.run(request), cancel).await;
        self.finish(request, result)
    }

    /// Resolve a request whose base has already been resolved
    pub async fn resolve_request(&self, request: ResourceRequest) -> Result<Resolved, ResolveError> {
        self.stats.increment_requests();
        let label = request.base.to_string();
        let result = self
            .supervise(self.run_request(request), std::future::pending::<()>())
            .await;
        self.finish(&label, result)
    }

    /// Rebuild and re-record the artifact a marker refers to
    ///
    /// Skips request parsing and the linkstore lookup entirely.
    pub async fn rebuild(&self, marker: &PendingMarker) -> Result<Resolved, ResolveError> {
        self.stats.increment_requests();
        let work = async {
            let built = self
                .builder()
                .build(marker, None)
                .await
                .map_err(ResolveError::from_build)?;
            Ok::<_, ResolveError>(rebuilt_result(built))
        };
        let result = self.supervise(work, std::future::pending::<()>()).await;
        self.finish(&marker.key().to_string(), result)
    }

    fn builder(&self) -> BuildContext {
        BuildContext {
            store: Arc::clone(&self.store),
            links: Arc::clone(&self.links),
            engine: Arc::clone(&self.engine),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Run `work` under the caller's cancellation and the configured deadline
    async fn supervise<F, C>(&self, work: F, cancel: C) -> Result<Resolved, ResolveError>
    where
        F: Future<Output = Result<Resolved, ResolveError>>,
        C: Future<Output = ()>,
    {
        let timeout_ms = self.config.timeout_ms;
        let deadline = async move {
            if timeout_ms == 0 {
                std::future::pending::<()>().await
            } else {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await
            }
        };

        tokio::select! {
            biased;
            _ = cancel => Err(ResolveError::Cancelled),
            _ = deadline => Err(ResolveError::TimedOut { timeout_ms }),
            result = work => result,
        }
    }

    fn finish(
        &self,
        request: &str,
        result: Result<Resolved, ResolveError>,
    ) -> Result<Resolved, ResolveError> {
        match &result {
            Ok(resolved) => {
                tracing::debug!(
                    request = %request,
                    content = %resolved.content,
                    via = resolved.via.as_str(),
                    bytes = resolved.data.len(),
                    "Resolved"
                );
            }
            Err(e) => {
                self.stats.increment_failures();
                tracing::debug!(request = %request, error = %e, "Failed");
            }
        }
        result
    }

    async fn run(&self, raw: &str) -> Result<Resolved, ResolveError> {
        tracing::debug!(request = %raw, "ParsingRequest");
        let parsed = parse_request(raw)?;
        let base = self.paths.resolve(&parsed.path).await?;
        self.run_request(ResourceRequest::new(base, parsed.spec))
            .await
    }

    async fn run_request(&self, request: ResourceRequest) -> Result<Resolved, ResolveError> {
        let ResourceRequest { base, spec, marker } = request;

        if marker.is_none() && spec.is_empty() {
            tracing::debug!(base = %base, "KeyFormed: no parameters, fetching base");
            let data = self
                .store
                .get(&base)
                .await
                .map_err(|e| ResolveError::from_fetch(&base, e))?;
            return Ok(Resolved {
                content: base,
                data,
                via: ResolvedVia::Base,
                marker: None,
            });
        }

        let (marker, prefetched) = match marker {
            Some(marker) => (marker, None),
            None => self.form_key(base, spec).await?,
        };
        let key = marker.key();
        tracing::debug!(
            base = %marker.original(),
            params = %marker.params(),
            "KeyFormed"
        );

        let cached = match self.links.lookup(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Linkstore lookup failed, treating as miss");
                None
            }
        };

        match cached {
            None => {
                self.stats.increment_cache_misses();
                tracing::debug!(key = %key, "CacheMiss");
                self.direct_build(marker, prefetched).await
            }
            Some(derived) => {
                self.stats.increment_cache_hits();
                tracing::debug!(key = %key, derived = %derived, "CacheHit");
                self.fetch_hit(marker, derived, prefetched).await
            }
        }
    }

    /// Settle `a=0` against the source dimensions so the key holds the effective spec
    async fn form_key(
        &self,
        base: ContentRef,
        spec: TransformSpec,
    ) -> Result<(PendingMarker, Option<Bytes>), ResolveError> {
        if !spec.needs_aspect_resolution() {
            return Ok((PendingMarker::new(base, spec), None));
        }

        let data = self
            .store
            .get(&base)
            .await
            .map_err(|e| ResolveError::from_fetch(&base, e))?;
        let (width, height) = self
            .engine
            .read_dimensions(&data)
            .map_err(|e| ResolveError::from_build(BuildError::Transform(e)))?;
        let effective = spec.resolve_aspect(width, height);
        Ok((PendingMarker::new(base, effective), Some(data)))
    }

    async fn direct_build(
        &self,
        marker: PendingMarker,
        source: Option<Bytes>,
    ) -> Result<Resolved, ResolveError> {
        tracing::debug!(key = %marker.key(), "DirectBuild");
        match self.builder().build(&marker, source).await {
            Ok(built) => Ok(Resolved {
                content: built.content,
                data: built.data,
                via: ResolvedVia::Built,
                marker: Some(built.marker),
            }),
            Err(e) => {
                tracing::warn!(key = %marker.key(), error = %e, "Build failed");
                Err(ResolveError::from_build(e))
            }
        }
    }

    async fn fetch_hit(
        &self,
        marker: PendingMarker,
        derived: ContentRef,
        source: Option<Bytes>,
    ) -> Result<Resolved, ResolveError> {
        if self.config.race_on_hit {
            self.racing_fetch(marker, derived, source).await
        } else {
            self.sequential_fetch(marker, derived, source).await
        }
    }

    async fn racing_fetch(
        &self,
        marker: PendingMarker,
        derived: ContentRef,
        source: Option<Bytes>,
    ) -> Result<Resolved, ResolveError> {
        tracing::debug!(key = %marker.key(), derived = %derived, "RacingFetch");

        let builder = self.builder();
        let task_marker = marker.clone();
        let handle = tokio::spawn(async move { builder.build(&task_marker, source).await });
        let rebuild = async move {
            match handle.await {
                Ok(result) => result.map(rebuilt_result),
                Err(e) => Err(BuildError::Task(e.to_string())),
            }
        };

        let cached = async {
            self.fetch_cached(&derived)
                .await
                .map(|data| self.cached_result(derived.clone(), data, marker.clone()))
        };

        match race_ok(cached, rebuild).await {
            Ok(win) => {
                match win.branch {
                    Branch::First => self.stats.increment_cached_wins(),
                    Branch::Second => self.stats.increment_rebuild_wins(),
                }
                Ok(win.value)
            }
            Err(RaceError { first, second }) => Err(self.exhausted(&marker, first, second)),
        }
    }

    /// Fetch the cached ref first and rebuild only when that fails
    async fn sequential_fetch(
        &self,
        marker: PendingMarker,
        derived: ContentRef,
        source: Option<Bytes>,
    ) -> Result<Resolved, ResolveError> {
        tracing::debug!(key = %marker.key(), derived = %derived, "SequentialFetch");

        let cached_err = match self.fetch_cached(&derived).await {
            Ok(data) => {
                self.stats.increment_cached_wins();
                return Ok(self.cached_result(derived, data, marker));
            }
            Err(e) => e,
        };

        match self.builder().build(&marker, source).await {
            Ok(built) => {
                self.stats.increment_rebuild_wins();
                Ok(rebuilt_result(built))
            }
            Err(e) => Err(self.exhausted(&marker, cached_err, e)),
        }
    }

    async fn fetch_cached(&self, derived: &ContentRef) -> Result<Bytes, StoreError> {
        self.store.get(derived).await.map_err(|e| {
            if e.is_not_found() {
                tracing::debug!(derived = %derived, "Cached derived artifact is gone");
            } else {
                tracing::warn!(derived = %derived, error = %e, "Cached fetch failed");
            }
            e
        })
    }

    fn cached_result(&self, derived: ContentRef, data: Bytes, marker: PendingMarker) -> Resolved {
        Resolved {
            content: derived,
            data,
            via: ResolvedVia::Cached,
            marker: Some(marker),
        }
    }

    fn exhausted(
        &self,
        marker: &PendingMarker,
        cached: StoreError,
        rebuild: BuildError,
    ) -> ResolveError {
        tracing::warn!(
            key = %marker.key(),
            cached_error = %cached,
            rebuild_error = %rebuild,
            "Resolution exhausted"
        );
        ResolveError::ResolutionExhausted {
            cached: Box::new(cached),
            rebuild: Box::new(rebuild),
        }
    }
}

fn rebuilt_result(built: Built) -> Resolved {
    Resolved {
        content: built.content,
        data: built.data,
        via: ResolvedVia::Rebuilt,
        marker: Some(built.marker),
    }
}
