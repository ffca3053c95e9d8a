// Filesystem-backed resolution tests
//
// FsStore blobs and the LogLinkStore log survive a restart: a fresh resolver
// opened on the same directory serves earlier builds from the cache.

use super::test_harness::*;
use linkstore::config::{Config, ResolverConfig};
use linkstore::content::{ContentStore, FsStore, StoreResolver};
use linkstore::error::ResolveError;
use linkstore::linkstore::{LinkStore, LogLinkStore};
use linkstore::resolver::{ResolvedVia, Resolver};
use linkstore::transform::TransformEngine;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

async fn open_resolver(dir: &Path) -> (Arc<FsStore>, Arc<LogLinkStore>, Resolver) {
    let store = Arc::new(FsStore::new(dir.join("blobs")));
    let links = Arc::new(LogLinkStore::open(dir.join("links.log")).await.unwrap());
    let resolver = Resolver::new(
        store.clone(),
        Arc::new(StoreResolver::new(store.clone())),
        links.clone(),
        TransformEngine::default(),
        ResolverConfig::default(),
    );
    (store, links, resolver)
}

#[tokio::test]
async fn test_entries_survive_restart() {
    let dir = TempDir::new().unwrap();
    let request;
    let built;
    {
        let (store, _links, resolver) = open_resolver(dir.path()).await;
        let base = store.put(png_bytes(60, 30)).await.unwrap();
        request = format!("/ipfs/{}&w=30", base);
        built = resolver.resolve(&request).await.unwrap();
        assert_eq!(built.via, ResolvedVia::Built);
    }

    let (_store, links, resolver) = open_resolver(dir.path()).await;
    assert_eq!(links.len().await, 1);
    let again = resolver.resolve(&request).await.unwrap();
    assert_eq!(again.via, ResolvedVia::Cached);
    assert_eq!(again.content, built.content);
}

#[tokio::test]
async fn test_collected_blob_is_rebuilt_from_disk() {
    let dir = TempDir::new().unwrap();
    let (store, links, resolver) = open_resolver(dir.path()).await;
    let base = store.put(png_bytes(60, 30)).await.unwrap();
    let request = format!("{}&x=10,y=5", base);

    let built = resolver.resolve(&request).await.unwrap();
    store.remove(&built.content).await.unwrap();

    let rebuilt = resolver.resolve(&request).await.unwrap();
    assert_eq!(rebuilt.via, ResolvedVia::Rebuilt);
    assert_eq!(rebuilt.content, built.content);
    assert!(store.contains(&built.content).await.unwrap());
    assert_eq!(links.len().await, 1);
}

#[tokio::test]
async fn test_stale_log_entry_is_corrected_on_disk() {
    let dir = TempDir::new().unwrap();
    let base;
    let fresh;
    {
        let (store, links, resolver) = open_resolver(dir.path()).await;
        base = store.put(png_bytes(60, 30)).await.unwrap();
        links
            .record(cache_key(&base, "h=10"), stale_ref())
            .await
            .unwrap();
        fresh = resolver
            .resolve(&format!("{}&h=10", base))
            .await
            .unwrap()
            .content;
        assert_ne!(fresh, stale_ref());
    }

    let links = LogLinkStore::open(dir.path().join("links.log")).await.unwrap();
    assert_eq!(
        links.lookup(&cache_key(&base, "h=10")).await.unwrap(),
        Some(fresh)
    );
}

#[tokio::test]
async fn test_dot_segments_cannot_escape_blob_directory() {
    let dir = TempDir::new().unwrap();
    let (store, _links, resolver) = open_resolver(dir.path()).await;
    store.put(png_bytes(8, 8)).await.unwrap();

    for request in ["/ipfs/..", "/ipfs/.", "..&w=10", "/ipld/.hidden&w=10"] {
        let err = resolver.resolve(request).await.unwrap_err();
        assert!(
            matches!(err, ResolveError::InvalidPath { .. }),
            "{}: {:?}",
            request,
            err
        );
        assert!(!err.is_retryable());
    }
}

#[tokio::test]
async fn test_resolver_from_config_file() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("LINKSTORE_IT_DATA_DIR", dir.path());

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        br#"
store:
  backend: fs
  root: "${LINKSTORE_IT_DATA_DIR}/blobs"
linkstore:
  backend: log
  path: "${LINKSTORE_IT_DATA_DIR}/links.log"
transform:
  max_width: 64
resolver:
  timeout_ms: 10000
"#,
    )
    .unwrap();
    file.flush().unwrap();

    let config = Config::from_file(file.path()).unwrap();
    let resolver = Resolver::from_config(&config).await.unwrap();
    let base = resolver.store().put(png_bytes(32, 32)).await.unwrap();

    let resolved = resolver
        .resolve(&format!("{}&w=64", base))
        .await
        .unwrap();
    assert_eq!(resolved.via, ResolvedVia::Built);
    assert!(dir.path().join("blobs").join(resolved.content.as_str()).exists());
    assert!(dir.path().join("links.log").exists());

    // Output limit from the transform section
    let err = resolver
        .resolve(&format!("{}&w=65", base))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());

    std::env::remove_var("LINKSTORE_IT_DATA_DIR");
}
