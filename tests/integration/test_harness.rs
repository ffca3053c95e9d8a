// Shared fixtures for resolver integration tests

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use linkstore::config::ResolverConfig;
use linkstore::content::{ContentRef, ContentStore, MemoryStore, StoreError, StoreResolver};
use linkstore::linkstore::{CacheKey, LinkStore, MemoryLinkStore};
use linkstore::resolver::Resolver;
use linkstore::transform::{CanonicalParams, TransformEngine};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Gradient image so resizes produce non-trivial output
pub fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn png_bytes(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    test_image(width, height)
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("encode png fixture");
    Bytes::from(out.into_inner())
}

pub fn jpeg_bytes(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    test_image(width, height)
        .write_to(&mut out, ImageOutputFormat::Jpeg(90))
        .expect("encode jpeg fixture");
    Bytes::from(out.into_inner())
}

pub fn cache_key(original: &ContentRef, params: &str) -> CacheKey {
    CacheKey::new(
        original.clone(),
        CanonicalParams::parse(params).expect("valid params"),
    )
}

pub fn stale_ref() -> ContentRef {
    ContentRef::parse("stale-derived-ref").expect("valid ref")
}

/// Memory store with injectable latency and failures
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    get_delay_ms: AtomicU64,
    unavailable: Mutex<HashSet<ContentRef>>,
    gets: AtomicU64,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_get_delay(&self, delay: Duration) {
        self.get_delay_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Make `get` for `content` fail with a non-NotFound error
    pub fn make_unavailable(&self, content: &ContentRef) {
        self.unavailable.lock().insert(content.clone());
    }

    pub fn remove(&self, content: &ContentRef) -> bool {
        self.inner.remove(content)
    }

    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn get(&self, content: &ContentRef) -> Result<Bytes, StoreError> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let delay = self.get_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.unavailable.lock().contains(content) {
            return Err(StoreError::Unavailable(format!("{} is on a dead peer", content)));
        }
        self.inner.get(content).await
    }

    async fn put(&self, data: Bytes) -> Result<ContentRef, StoreError> {
        self.inner.put(data).await
    }

    async fn contains(&self, content: &ContentRef) -> Result<bool, StoreError> {
        self.inner.contains(content).await
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub links: Arc<MemoryLinkStore>,
    pub resolver: Resolver,
}

pub fn harness(config: ResolverConfig) -> Harness {
    let store = Arc::new(FlakyStore::new());
    let links = Arc::new(MemoryLinkStore::new(10_000));
    let resolver = Resolver::new(
        store.clone(),
        Arc::new(StoreResolver::new(store.clone())),
        links.clone(),
        TransformEngine::default(),
        config,
    );
    Harness {
        store,
        links,
        resolver,
    }
}

impl Harness {
    pub async fn put(&self, data: Bytes) -> ContentRef {
        self.store.put(data).await.expect("put fixture")
    }

    pub async fn lookup(&self, original: &ContentRef, params: &str) -> Option<ContentRef> {
        self.links
            .lookup(&cache_key(original, params))
            .await
            .expect("lookup")
    }

    pub async fn record_stale(&self, original: &ContentRef, params: &str) {
        self.links
            .record(cache_key(original, params), stale_ref())
            .await
            .expect("record stale entry");
    }
}
