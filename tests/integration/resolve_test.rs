// End-to-end resolution tests against in-memory backends
//
// Covers the non-racing paths of the orchestrator:
// - Requests without parameters return the base content
// - Cache misses build, store and record the derived artifact
// - Equivalent parameter strings share one cache entry
// - Caller errors surface directly and leave the cache untouched

use super::test_harness::*;
use linkstore::config::ResolverConfig;
use linkstore::content::ContentStore;
use linkstore::error::ResolveError;
use linkstore::linkstore::LinkStore;
use linkstore::resolver::{PendingMarker, ResolvedVia, ResourceRequest};
use linkstore::transform::{TransformError, TransformSpec};

#[tokio::test]
async fn test_request_without_params_returns_base_bytes() {
    let h = harness(ResolverConfig::default());
    let data = png_bytes(16, 16);
    let base = h.put(data.clone()).await;

    for request in [
        format!("/ipfs/{}", base),
        format!("/ipld/{}", base),
        base.to_string(),
        format!("{}&", base),
    ] {
        let resolved = h.resolver.resolve(&request).await.unwrap();
        assert_eq!(resolved.via, ResolvedVia::Base, "{}", request);
        assert_eq!(resolved.content, base);
        assert_eq!(resolved.data, data);
    }
    assert_eq!(h.links.len().await, 0);
}

#[tokio::test]
async fn test_miss_records_entry_under_canonical_key() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(64, 32)).await;

    let resolved = h
        .resolver
        .resolve(&format!("/ipfs/{}&h=16,w=32", base))
        .await
        .unwrap();

    assert_eq!(resolved.via, ResolvedVia::Built);
    assert_eq!(h.lookup(&base, "w=32,h=16").await, Some(resolved.content.clone()));
    let stored = h.store.get(&resolved.content).await.unwrap();
    assert_eq!(stored, resolved.data);

    let img = image::load_from_memory(&resolved.data).unwrap();
    assert_eq!((img.width(), img.height()), (32, 16));
}

#[tokio::test]
async fn test_permuted_params_share_one_entry() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(64, 32)).await;

    let first = h
        .resolver
        .resolve(&format!("{}&w=20,h=10,a=1", base))
        .await
        .unwrap();
    let second = h
        .resolver
        .resolve(&format!("{}&a=1,h=10,w=20", base))
        .await
        .unwrap();

    assert_eq!(first.via, ResolvedVia::Built);
    assert_eq!(second.via, ResolvedVia::Cached);
    assert_eq!(first.content, second.content);
    assert_eq!(h.links.len().await, 1);
}

#[tokio::test]
async fn test_aspect_fix_discards_requested_height() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(200, 50)).await;

    let first = h
        .resolver
        .resolve(&format!("{}&w=100,h=10,a=0", base))
        .await
        .unwrap();
    let second = h
        .resolver
        .resolve(&format!("{}&w=100,h=999,a=0", base))
        .await
        .unwrap();

    assert_eq!(first.content, second.content);
    assert_eq!(h.lookup(&base, "w=100,h=25,a=0").await, Some(first.content));
    assert_eq!(h.lookup(&base, "w=100,h=10,a=0").await, None);

    let img = image::load_from_memory(&second.data).unwrap();
    assert_eq!((img.width(), img.height()), (100, 25));
}

#[tokio::test]
async fn test_aspect_resolution_fetches_base_once() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(200, 50)).await;
    let before = h.store.gets();

    h.resolver
        .resolve(&format!("{}&w=100,h=10,a=0", base))
        .await
        .unwrap();

    // Dimension read and build share the prefetched bytes
    assert_eq!(h.store.gets() - before, 1);
}

#[tokio::test]
async fn test_crop_from_origin_to_edge() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(100, 100)).await;

    let resolved = h
        .resolver
        .resolve(&format!("{}&x=99,w=1", base))
        .await
        .unwrap();
    let img = image::load_from_memory(&resolved.data).unwrap();
    assert_eq!((img.width(), img.height()), (1, 100));
}

#[tokio::test]
async fn test_crop_out_of_bounds_is_not_retryable() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(100, 100)).await;

    for params in ["x=100", "x=99,w=2", "y=100", "y=50,h=51"] {
        let err = h
            .resolver
            .resolve(&format!("{}&{}", base, params))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ResolveError::Transform(TransformError::CropOutOfBounds { .. })
            ),
            "{}: {:?}",
            params,
            err
        );
        assert!(!err.is_retryable());
    }
    assert_eq!(h.links.len().await, 0);
}

#[tokio::test]
async fn test_zero_dimension_is_invalid() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(10, 10)).await;

    let err = h
        .resolver
        .resolve(&format!("{}&w=0", base))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Transform(TransformError::InvalidDimensions { .. })
    ));
}

#[tokio::test]
async fn test_unknown_key_rejected_in_any_position() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(10, 10)).await;

    for fragment in ["z=1", "z=1,w=5", "w=5,z=1", "w=5,z=1,h=5"] {
        let err = h
            .resolver
            .resolve(&format!("{}&{}", base, fragment))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ResolveError::InvalidParameter(_)),
            "{}",
            fragment
        );
    }
    assert_eq!(h.resolver.stats().snapshot().failures, 4);
}

#[tokio::test]
async fn test_malformed_params_are_invalid() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(10, 10)).await;

    for fragment in ["w", "w=", "w=-1", "w=1.5", "w=1,w=2", "a=2", "w=1=2"] {
        let err = h
            .resolver
            .resolve(&format!("{}&{}", base, fragment))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ResolveError::InvalidParameter(_)),
            "{}",
            fragment
        );
    }
}

#[tokio::test]
async fn test_missing_and_malformed_paths() {
    let h = harness(ResolverConfig::default());

    let err = h.resolver.resolve("/ipfs/absent&w=10").await.unwrap_err();
    assert!(matches!(err, ResolveError::NotFound(_)));

    let err = h.resolver.resolve("/ipns/abc&w=10").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidPath { .. }));

    let err = h.resolver.resolve("/ipfs/abc/def").await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_jpeg_source_stays_jpeg() {
    let h = harness(ResolverConfig::default());
    let base = h.put(jpeg_bytes(64, 64)).await;

    let resolved = h
        .resolver
        .resolve(&format!("{}&w=32", base))
        .await
        .unwrap();
    assert_eq!(&resolved.data[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_resolve_request_with_marker_skips_dimension_read() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(200, 50)).await;
    let effective = TransformSpec::parse("w=100,h=25,a=0").unwrap();
    let marker = PendingMarker::new(base.clone(), effective);

    let resolved = h
        .resolver
        .resolve_request(ResourceRequest::from_marker(marker.clone()))
        .await
        .unwrap();

    assert_eq!(resolved.via, ResolvedVia::Built);
    assert_eq!(resolved.marker, Some(marker));
    assert!(h.lookup(&base, "w=100,h=25,a=0").await.is_some());
}

#[tokio::test]
async fn test_rebuild_restores_collected_artifact() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(40, 40)).await;

    let built = h
        .resolver
        .resolve(&format!("{}&w=20", base))
        .await
        .unwrap();
    assert!(h.store.remove(&built.content));

    let rebuilt = h
        .resolver
        .rebuild(built.marker.as_ref().unwrap())
        .await
        .unwrap();
    assert_eq!(rebuilt.via, ResolvedVia::Rebuilt);
    assert_eq!(rebuilt.content, built.content);
    assert!(h.store.contains(&built.content).await.unwrap());
}

#[tokio::test]
async fn test_stats_track_hits_and_misses() {
    let h = harness(ResolverConfig::default());
    let base = h.put(png_bytes(40, 40)).await;
    let request = format!("{}&w=10", base);

    h.resolver.resolve(&request).await.unwrap();
    h.resolver.resolve(&request).await.unwrap();
    h.resolver.resolve(&base.to_string()).await.unwrap();

    let snapshot = h.resolver.stats().snapshot();
    assert_eq!(snapshot.requests, 3);
    assert_eq!(snapshot.cache_misses, 1);
    assert_eq!(snapshot.cache_hits, 1);
    assert_eq!(snapshot.failures, 0);
    assert!((snapshot.hit_rate() - 0.5).abs() < f64::EPSILON);
}
